use serde::{Deserialize, Serialize};

/// One vehicle as stored in inventory.
///
/// The shape matches the `vehicle` table one-to-one; the dialogue loop only
/// reads it for rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub motorization: f64,
    pub fuel: String,
    pub color: String,
    pub mileage: f64,
    pub doors: i64,
    pub transmission: String,
    pub price: f64,
    pub air_conditioning: bool,
    pub electric_steering: bool,
    pub status: String,
}

impl Vehicle {
    /// First presentation line: make, trim and paint at a glance.
    pub fn headline(&self) -> String {
        format!(
            "{} {} {} {:.1} {} - {}",
            self.brand, self.model, self.year, self.motorization, self.fuel, self.color
        )
    }

    /// Second presentation line: odometer and asking price.
    pub fn price_line(&self) -> String {
        format!("{} km - $ {:.2}", self.mileage, self.price)
    }
}
