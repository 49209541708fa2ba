use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct CensusDatasetResolver;

impl CensusDatasetResolver {
    pub async fn sources(
        &self,
        ctx: &RequestContext,
        obj: &CensusDataset,
        limit: Option<i32>,
        filter: Option<CensusSourceFilter>,
    ) -> Result<Vec<CensusSource>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .census_sources_by_dataset_id
            .load(param)
            .await
            .field("sources")
    }
}

pub struct CensusGeographyResolver;

impl CensusGeographyResolver {
    /// Values of the named tables for this geography.
    ///
    /// The table names form part of the batch key, so geographies asking
    /// for the same tables share one query.
    pub async fn values(
        &self,
        ctx: &RequestContext,
        obj: &CensusGeography,
        table_names: &[String],
        limit: Option<i32>,
    ) -> Result<Vec<CensusValue>, ResolverError> {
        let key = (obj.geoid.clone(), table_names.join(","));
        ctx.loaders
            .census_values_by_geography_id
            .load(Param::new(key).with_limit(limit))
            .await
            .field("values")
    }
}

pub struct CensusValueResolver;

impl CensusValueResolver {
    pub async fn table(
        &self,
        ctx: &RequestContext,
        obj: &CensusValue,
    ) -> Result<Option<CensusTable>, ResolverError> {
        ctx.loaders
            .census_tables_by_id
            .load(obj.table_id)
            .await
            .field("table")
    }
}

pub struct CensusTableResolver;

impl CensusTableResolver {
    pub async fn fields(
        &self,
        ctx: &RequestContext,
        obj: &CensusTable,
        limit: Option<i32>,
    ) -> Result<Vec<CensusField>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .census_fields_by_table_id
            .load(param)
            .await
            .field("fields")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::request::User;
    use crate::resolvers::fixtures::{Fixture, bart};

    fn table(id: i64, name: &str) -> CensusTable {
        CensusTable {
            id,
            dataset_id: 1,
            table_name: name.into(),
            table_title: name.into(),
            table_group: None,
        }
    }

    fn value(geoid: &str, table_id: i64, field: &str, v: f64) -> CensusValue {
        CensusValue {
            geoid: geoid.into(),
            table_id,
            values: BTreeMap::from([(field.to_string(), v)]),
        }
    }

    fn census() -> Fixture {
        let mut data = bart();
        data.census_datasets.push(CensusDataset {
            id: 1,
            name: "acsdt5y2022".into(),
            ..Default::default()
        });
        data.census_sources.extend([
            CensusSource {
                id: 1,
                dataset_id: 1,
                name: "tl_2022_06_tract.zip".into(),
                ..Default::default()
            },
            CensusSource {
                id: 2,
                dataset_id: 1,
                name: "tl_2022_32_tract.zip".into(),
                ..Default::default()
            },
        ]);
        data.census_tables
            .extend([table(1, "b01001"), table(2, "b19013")]);
        data.census_fields.push(CensusField {
            id: 1,
            table_id: 1,
            field_name: "b01001_001e".into(),
            field_title: "Total".into(),
            column_order: 1.0,
        });
        data.census_values.extend([
            value("1400000US06001402800", 1, "b01001_001e", 2345.0),
            value("1400000US06001402800", 2, "b19013_001e", 81000.0),
            value("1400000US06001403000", 1, "b01001_001e", 999.0),
        ]);
        Fixture::with_data(data)
    }

    #[tokio::test]
    async fn values_are_keyed_by_geography_and_tables() {
        let fx = census();
        let ctx = fx.context(User::anon());
        let tract = CensusGeography {
            geoid: "1400000US06001402800".into(),
            ..Default::default()
        };
        let other = CensusGeography {
            geoid: "1400000US06001403000".into(),
            ..Default::default()
        };
        let population = vec!["b01001".to_string()];
        let both = vec!["b01001".to_string(), "b19013".to_string()];

        let (a, b, c) = tokio::join!(
            CensusGeographyResolver.values(&ctx, &tract, &population, None),
            CensusGeographyResolver.values(&ctx, &other, &population, None),
            CensusGeographyResolver.values(&ctx, &tract, &both, None),
        );
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap()[0].values["b01001_001e"], 999.0);
        let c = c.unwrap();
        assert_eq!(c.len(), 2);

        let income = c.iter().find(|v| v.table_id == 2).unwrap();
        let table = CensusValueResolver.table(&ctx, income).await.unwrap().unwrap();
        assert_eq!(table.table_name, "b19013");
    }

    #[tokio::test]
    async fn dataset_sources_and_table_fields() {
        let fx = census();
        let ctx = fx.context(User::anon());
        let dataset = CensusDataset {
            id: 1,
            ..Default::default()
        };
        let nevada = CensusDatasetResolver
            .sources(
                &ctx,
                &dataset,
                None,
                Some(CensusSourceFilter {
                    name: Some("tl_2022_32_tract.zip".into()),
                }),
            )
            .await
            .unwrap();
        assert_eq!(nevada.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2]);
        let all = CensusDatasetResolver
            .sources(&ctx, &dataset, None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let fields = CensusTableResolver
            .fields(&ctx, &table(1, "b01001"), None)
            .await
            .unwrap();
        assert_eq!(fields[0].field_name, "b01001_001e");
    }
}
