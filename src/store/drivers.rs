use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::driver::Driver;

/// Registry of driver references known to this core.
pub struct DriverStore {
    drivers: DashMap<Uuid, Driver>,
}

impl DriverStore {
    pub fn new() -> Self {
        Self {
            drivers: DashMap::new(),
        }
    }

    pub fn register(&self, name: String, phone: String) -> Driver {
        let driver = Driver {
            id: Uuid::new_v4(),
            name,
            phone,
            created_at: Utc::now(),
        };
        self.drivers.insert(driver.id, driver.clone());
        driver
    }

    pub fn exists(&self, id: Uuid) -> bool {
        self.drivers.contains_key(&id)
    }

    pub fn list(&self) -> Vec<Driver> {
        self.drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl Default for DriverStore {
    fn default() -> Self {
        Self::new()
    }
}
