use chrono::NaiveDate;

use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

const EXCEPTION_ADDED: i32 = 1;
const EXCEPTION_REMOVED: i32 = 2;

pub struct CalendarResolver;

impl CalendarResolver {
    pub async fn added_dates(
        &self,
        ctx: &RequestContext,
        obj: &Calendar,
        limit: Option<i32>,
    ) -> Result<Vec<NaiveDate>, ResolverError> {
        self.exceptions(ctx, obj, limit, EXCEPTION_ADDED, "added_dates")
            .await
    }

    pub async fn removed_dates(
        &self,
        ctx: &RequestContext,
        obj: &Calendar,
        limit: Option<i32>,
    ) -> Result<Vec<NaiveDate>, ResolverError> {
        self.exceptions(ctx, obj, limit, EXCEPTION_REMOVED, "removed_dates")
            .await
    }

    async fn exceptions(
        &self,
        ctx: &RequestContext,
        obj: &Calendar,
        limit: Option<i32>,
        exception_type: i32,
        field: &'static str,
    ) -> Result<Vec<NaiveDate>, ResolverError> {
        let filter = CalendarDateFilter {
            exception_type: Some(exception_type),
            ..Default::default()
        };
        let param = Param::new(obj.id)
            .with_limit(limit)
            .with_filter(Some(filter));
        let dates = ctx
            .loaders
            .calendar_dates_by_service_id
            .load(param)
            .await
            .field(field)?;
        Ok(dates.into_iter().map(|cd| cd.date).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::User;
    use crate::resolvers::fixtures::{Fixture, d};

    #[tokio::test]
    async fn exceptions_split_by_type() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let calendars = ctx.loaders.calendars_by_id.load_many(vec![1, 2]).await;
        let weekday = calendars[0].clone().unwrap().unwrap();
        let saturday = calendars[1].clone().unwrap().unwrap();

        let (removed, added) = tokio::join!(
            CalendarResolver.removed_dates(&ctx, &weekday, None),
            CalendarResolver.added_dates(&ctx, &saturday, None),
        );
        assert_eq!(removed.unwrap(), vec![d(2018, 7, 4)]);
        assert_eq!(added.unwrap(), vec![d(2018, 7, 4)]);
        assert!(
            CalendarResolver
                .added_dates(&ctx, &weekday, None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
