use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use opentelemetry::metrics::{Meter, ObservableGauge};
use opentelemetry::KeyValue;

use crate::app::ports::GaugeRegistry;
use crate::domain::ObservationSet;

struct GaugeSlot {
    values: Arc<RwLock<ObservationSet>>,
    // Held so the instrument (and its callback) stays alive for the life of
    // the registry.
    _gauge: ObservableGauge<u64>,
}

/// Exports gauges through OpenTelemetry observable instruments.
///
/// The SDK accumulates instrument callbacks, so registering a fresh callback
/// per invocation would merge every batch ever seen. Instead each metric name
/// gets exactly one instrument whose callback reads a shared slot, and
/// re-registration overwrites the slot. What the collector sees after a
/// registration is that registration's values and nothing else. The slot map
/// lock also serializes concurrent registrations on the same name.
pub struct OtelGaugeRegistry {
    meter: Meter,
    slots: Mutex<HashMap<String, GaugeSlot>>,
}

impl OtelGaugeRegistry {
    pub fn new(meter: Meter) -> Self {
        Self { meter, slots: Mutex::new(HashMap::new()) }
    }
}

impl GaugeRegistry for OtelGaugeRegistry {
    fn register_gauge(
        &self,
        name: &str,
        description: &str,
        values: ObservationSet,
    ) -> Result<(), String> {
        let mut slots = self.slots.lock().map_err(|err| err.to_string())?;

        if let Some(slot) = slots.get(name) {
            let mut current = slot.values.write().map_err(|err| err.to_string())?;
            *current = values;
            return Ok(());
        }

        let shared = Arc::new(RwLock::new(values));
        let observed = Arc::clone(&shared);
        let gauge = self
            .meter
            .u64_observable_gauge(name.to_owned())
            .with_description(description.to_owned())
            .with_callback(move |observer| {
                let Ok(set) = observed.read() else {
                    return;
                };
                for observation in set.snapshot() {
                    let attributes: Vec<KeyValue> = observation
                        .attributes
                        .iter()
                        .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
                        .collect();
                    observer.observe(observation.value, &attributes);
                }
            })
            .build();

        slots.insert(name.to_owned(), GaugeSlot { values: shared, _gauge: gauge });
        Ok(())
    }
}
