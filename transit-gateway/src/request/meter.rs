//! Resource metering.

use std::sync::Mutex;

/// A metered event.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterEvent {
    pub name: String,
    pub value: f64,
    pub dimensions: Vec<(String, String)>,
}

/// Where cost accounting is reported.
pub trait ApiMeter: Send + Sync {
    /// Tag every later event of `meter` with `key=value`.
    fn add_dimension(&self, meter: &str, key: &str, value: &str);

    fn meter(&self, name: &str, value: f64, dimensions: &[(String, String)]);
}

/// Keeps dimensions and events in memory.
#[derive(Debug, Default)]
pub struct MemoryMeter {
    dimensions: Mutex<Vec<(String, String, String)>>,
    events: Mutex<Vec<MeterEvent>>,
}

impl MemoryMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// (meter, key, value) tags added so far.
    pub fn dimensions(&self) -> Vec<(String, String, String)> {
        self.dimensions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events(&self) -> Vec<MeterEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ApiMeter for MemoryMeter {
    fn add_dimension(&self, meter: &str, key: &str, value: &str) {
        self.dimensions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((meter.to_string(), key.to_string(), value.to_string()));
    }

    fn meter(&self, name: &str, value: f64, dimensions: &[(String, String)]) {
        let mut all: Vec<(String, String)> = self
            .dimensions()
            .into_iter()
            .filter(|(m, _, _)| m == name)
            .map(|(_, k, v)| (k, v))
            .collect();
        all.extend(dimensions.iter().cloned());
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MeterEvent {
                name: name.to_string(),
                value,
                dimensions: all,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_their_meter_dimensions() {
        let meter = MemoryMeter::new();
        meter.add_dimension("graphql", "resolver", "stops");
        meter.add_dimension("other", "key", "value");
        meter.meter("graphql", 1.0, &[("status".into(), "ok".into())]);

        let events = meter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].dimensions,
            vec![
                ("resolver".to_string(), "stops".to_string()),
                ("status".to_string(), "ok".to_string()),
            ]
        );
    }
}
