use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::repositories::{NewVehicle, RepositoryError, SqlVehicleRepository, VehicleRepository};
use crate::DbPool;

/// Fixed showroom records every seeded database carries. Verification keys
/// off brand + model, so these pairs stay unique.
const SHOWROOM: &[SeedVehicle] = &[
    SeedVehicle {
        brand: "Toyota",
        model: "Corolla",
        year: 2021,
        motorization: 2.0,
        fuel: "Flex",
        color: "Silver",
        mileage: 35000.0,
        doors: 4,
        transmission: "CVT",
        price: 98500.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Toyota",
        model: "Hilux",
        year: 2019,
        motorization: 2.8,
        fuel: "Diesel",
        color: "White",
        mileage: 88000.0,
        doors: 4,
        transmission: "Automatic",
        price: 152000.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Honda",
        model: "Civic",
        year: 2020,
        motorization: 1.5,
        fuel: "Gasoline",
        color: "Black",
        mileage: 41000.0,
        doors: 4,
        transmission: "CVT",
        price: 112000.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Honda",
        model: "Fit",
        year: 2017,
        motorization: 1.5,
        fuel: "Flex",
        color: "Gray",
        mileage: 96000.0,
        doors: 4,
        transmission: "CVT",
        price: 64000.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Fiat",
        model: "Argo",
        year: 2023,
        motorization: 1.0,
        fuel: "Flex",
        color: "Red",
        mileage: 0.0,
        doors: 4,
        transmission: "Manual",
        price: 74900.0,
        air_conditioning: true,
        electric_steering: true,
        status: "new",
    },
    SeedVehicle {
        brand: "Fiat",
        model: "Toro",
        year: 2021,
        motorization: 1.8,
        fuel: "Flex",
        color: "Blue",
        mileage: 52000.0,
        doors: 4,
        transmission: "Automatic",
        price: 118000.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Chevrolet",
        model: "Onix",
        year: 2022,
        motorization: 1.0,
        fuel: "Flex",
        color: "White",
        mileage: 18000.0,
        doors: 4,
        transmission: "Manual",
        price: 79900.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Volkswagen",
        model: "Gol",
        year: 2015,
        motorization: 1.6,
        fuel: "Flex",
        color: "Silver",
        mileage: 140000.0,
        doors: 2,
        transmission: "Manual",
        price: 38500.0,
        air_conditioning: false,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Hyundai",
        model: "HB20",
        year: 2020,
        motorization: 1.0,
        fuel: "Flex",
        color: "Blue",
        mileage: 47000.0,
        doors: 4,
        transmission: "Manual",
        price: 62000.0,
        air_conditioning: true,
        electric_steering: true,
        status: "used",
    },
    SeedVehicle {
        brand: "Renault",
        model: "Kwid",
        year: 2024,
        motorization: 1.0,
        fuel: "Flex",
        color: "Orange",
        mileage: 0.0,
        doors: 4,
        transmission: "Manual",
        price: 69900.0,
        air_conditioning: true,
        electric_steering: false,
        status: "new",
    },
];

const GENERATED_MODELS: &[(&str, &str)] = &[
    ("Toyota", "Yaris"),
    ("Toyota", "SW4"),
    ("Honda", "HR-V"),
    ("Honda", "City"),
    ("Fiat", "Pulse"),
    ("Fiat", "Strada"),
    ("Chevrolet", "Tracker"),
    ("Chevrolet", "S10"),
    ("Volkswagen", "Polo"),
    ("Volkswagen", "T-Cross"),
    ("Hyundai", "Creta"),
    ("Renault", "Duster"),
    ("Jeep", "Renegade"),
    ("Jeep", "Compass"),
    ("Nissan", "Kicks"),
];

const GENERATED_FUELS: &[&str] =
    &["Gasoline", "Ethanol", "Flex", "Diesel", "Electric", "Hybrid"];

const GENERATED_COLORS: &[&str] = &[
    "Black", "White", "Silver", "Blue", "Red", "Gray", "Green", "Yellow", "Brown", "Beige",
];

const GENERATED_TRANSMISSIONS: &[&str] =
    &["Manual", "Automatic", "CVT", "Semi-automatic", "Automated", "DCT"];

const GENERATED_MOTORIZATIONS: &[f64] = &[1.0, 1.3, 1.4, 1.5, 1.6, 1.8, 2.0, 2.5, 3.0];

const GENERATED_MILEAGES: &[f64] = &[0.0, 50000.0, 150000.0, 200000.0];

struct SeedVehicle {
    brand: &'static str,
    model: &'static str,
    year: i64,
    motorization: f64,
    fuel: &'static str,
    color: &'static str,
    mileage: f64,
    doors: i64,
    transmission: &'static str,
    price: f64,
    air_conditioning: bool,
    electric_steering: bool,
    status: &'static str,
}

impl SeedVehicle {
    fn to_new_vehicle(&self) -> NewVehicle {
        NewVehicle {
            brand: self.brand.to_string(),
            model: self.model.to_string(),
            year: self.year,
            motorization: self.motorization,
            fuel: self.fuel.to_string(),
            color: self.color.to_string(),
            mileage: self.mileage,
            doors: self.doors,
            transmission: self.transmission.to_string(),
            price: self.price,
            air_conditioning: self.air_conditioning,
            electric_steering: self.electric_steering,
            status: self.status.to_string(),
        }
    }
}

pub struct SeedResult {
    pub inserted: u64,
    pub skipped: bool,
}

pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Deterministic showroom dataset plus an optional generated top-up.
pub struct ShowroomSeedDataset;

impl ShowroomSeedDataset {
    pub fn fixed_len() -> usize {
        SHOWROOM.len()
    }

    /// Load the dataset. A non-empty vehicle table is left untouched; the
    /// caller decides whether that counts as success (it does for `seed`).
    pub async fn load(pool: &DbPool, total_count: usize) -> Result<SeedResult, RepositoryError> {
        let repository = SqlVehicleRepository::new(pool.clone());

        if repository.count().await? > 0 {
            return Ok(SeedResult { inserted: 0, skipped: true });
        }

        let mut vehicles: Vec<NewVehicle> =
            SHOWROOM.iter().map(SeedVehicle::to_new_vehicle).collect();
        if total_count > vehicles.len() {
            vehicles.extend(generate_vehicles(total_count - vehicles.len(), 0x0c4a71));
        }

        let inserted = repository.insert_many(&vehicles).await?;
        Ok(SeedResult { inserted, skipped: false })
    }

    /// Confirm every fixed showroom record landed.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SHOWROOM.len());

        for seed in SHOWROOM {
            let present = sqlx::query_scalar::<_, i64>(
                "SELECT EXISTS(SELECT 1 FROM vehicle WHERE brand = ?1 AND model = ?2 AND year = ?3)",
            )
            .bind(seed.brand)
            .bind(seed.model)
            .bind(seed.year)
            .fetch_one(pool)
            .await?;
            checks.push((seed.model, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

/// Generate `count` plausible vehicles from the fixed tables. Same seed,
/// same output.
pub fn generate_vehicles(count: usize, seed: u64) -> Vec<NewVehicle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vehicles = Vec::with_capacity(count);

    for _ in 0..count {
        let (brand, model) = GENERATED_MODELS.choose(&mut rng).copied().unwrap_or(("Toyota", "Corolla"));
        let mileage = GENERATED_MILEAGES.choose(&mut rng).copied().unwrap_or(0.0);

        vehicles.push(NewVehicle {
            brand: brand.to_string(),
            model: model.to_string(),
            year: rng.gen_range(2008..=2024),
            motorization: GENERATED_MOTORIZATIONS.choose(&mut rng).copied().unwrap_or(1.0),
            fuel: GENERATED_FUELS.choose(&mut rng).copied().unwrap_or("Flex").to_string(),
            color: GENERATED_COLORS.choose(&mut rng).copied().unwrap_or("Black").to_string(),
            mileage,
            doors: *[2i64, 4].choose(&mut rng).unwrap_or(&4),
            transmission: GENERATED_TRANSMISSIONS
                .choose(&mut rng)
                .copied()
                .unwrap_or("Manual")
                .to_string(),
            price: rng.gen_range(5_000..=150_000) as f64,
            air_conditioning: rng.gen_bool(0.9),
            electric_steering: rng.gen_bool(0.8),
            status: if mileage == 0.0 { "new".to_string() } else { "used".to_string() },
        });
    }

    vehicles
}

#[cfg(test)]
mod tests {
    use super::{generate_vehicles, ShowroomSeedDataset};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn load_inserts_fixed_dataset_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = ShowroomSeedDataset::load(&pool, 0).await.expect("load");
        assert!(!result.skipped);
        assert_eq!(result.inserted as usize, ShowroomSeedDataset::fixed_len());

        let verification = ShowroomSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present);
    }

    #[tokio::test]
    async fn load_skips_when_inventory_already_populated() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        ShowroomSeedDataset::load(&pool, 0).await.expect("first load");
        let second = ShowroomSeedDataset::load(&pool, 100).await.expect("second load");

        assert!(second.skipped);
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test]
    async fn load_tops_up_with_generated_vehicles() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = ShowroomSeedDataset::load(&pool, 50).await.expect("load");
        assert_eq!(result.inserted, 50);
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = generate_vehicles(25, 7);
        let second = generate_vehicles(25, 7);

        assert_eq!(first.len(), 25);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.brand, b.brand);
            assert_eq!(a.model, b.model);
            assert_eq!(a.year, b.year);
            assert_eq!(a.price, b.price);
        }
    }

    #[test]
    fn generated_status_tracks_mileage() {
        for vehicle in generate_vehicles(40, 11) {
            if vehicle.mileage == 0.0 {
                assert_eq!(vehicle.status, "new");
            } else {
                assert_eq!(vehicle.status, "used");
            }
        }
    }
}
