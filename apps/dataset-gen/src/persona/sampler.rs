//! Base Sampler: draws the demographic base fields from fixed population
//! distributions for Iranian elderly people.
//!
//! Deterministic given an explicit seed; entropy-seeded otherwise.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::persona::BaseFields;

#[derive(Debug, Clone, PartialEq)]
pub struct Weighted {
    pub value: String,
    pub weight: u32,
}

/// Inclusive age range with a weight; the age inside a band is uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBand {
    pub min: u8,
    pub max: u8,
    pub weight: u32,
}

/// The fixed distribution table. Read-only once a sampler is built from it.
#[derive(Debug, Clone)]
pub struct DistributionTable {
    pub gender: Vec<Weighted>,
    pub age_bands: Vec<AgeBand>,
    pub marital_status: Vec<Weighted>,
    pub children: Vec<Weighted>,
    pub living_situation: Vec<Weighted>,
    pub ethnicity: Vec<Weighted>,
    /// Language is determined by ethnicity.
    pub language_by_ethnicity: HashMap<String, String>,
    /// Religion is drawn jointly with ethnicity.
    pub religion_by_ethnicity: HashMap<String, Vec<Weighted>>,
    /// Used for ethnicities without their own religion distribution.
    pub default_religion: Vec<Weighted>,
}

fn weighted(pairs: &[(&str, u32)]) -> Vec<Weighted> {
    pairs
        .iter()
        .map(|(value, weight)| Weighted {
            value: value.to_string(),
            weight: *weight,
        })
        .collect()
}

impl DistributionTable {
    pub fn iranian_elderly() -> Self {
        let age_bands = [25, 20, 15, 15, 10, 10, 5, 3, 2, 1]
            .into_iter()
            .enumerate()
            .map(|(i, weight)| {
                let min = 65 + 3 * i as u8;
                AgeBand {
                    min,
                    max: min + 2,
                    weight,
                }
            })
            .collect();

        let language_by_ethnicity = [
            ("Persian", "Persian"),
            ("Azeri", "Azeri"),
            ("Kurdish", "Kurdish"),
            ("Lur", "Luri"),
            ("Baloch", "Balochi"),
            ("Arab", "Arabic"),
            ("Turkmen", "Turkmen"),
            ("Gilaki", "Gilaki"),
            ("Mazandarani", "Mazandarani"),
            ("Qashqai", "Qashqai"),
        ]
        .into_iter()
        .map(|(e, l)| (e.to_string(), l.to_string()))
        .collect();

        let mostly_shia = weighted(&[("Shia Muslim", 95), ("Sunni Muslim", 5)]);
        let mostly_sunni = weighted(&[("Sunni Muslim", 80), ("Shia Muslim", 20)]);
        let mut religion_by_ethnicity = HashMap::new();
        for ethnicity in ["Persian", "Azeri", "Gilaki", "Mazandarani"] {
            religion_by_ethnicity.insert(ethnicity.to_string(), mostly_shia.clone());
        }
        for ethnicity in ["Kurdish", "Baloch", "Turkmen"] {
            religion_by_ethnicity.insert(ethnicity.to_string(), mostly_sunni.clone());
        }
        religion_by_ethnicity.insert(
            "Arab".to_string(),
            weighted(&[("Shia Muslim", 70), ("Sunni Muslim", 30)]),
        );

        Self {
            gender: weighted(&[("Female", 53), ("Male", 47)]),
            age_bands,
            marital_status: weighted(&[
                ("Married", 60),
                ("Single", 30),
                ("Divorced", 5),
                ("Widowed", 5),
            ]),
            children: weighted(&[("None", 5), ("1", 15), ("2-3", 30), ("4+", 50)]),
            living_situation: weighted(&[
                ("Living with Family", 50),
                ("Living Alone", 30),
                ("Shared Housing", 20),
            ]),
            ethnicity: weighted(&[
                ("Persian", 50),
                ("Azeri", 25),
                ("Kurdish", 10),
                ("Lur", 5),
                ("Baloch", 3),
                ("Arab", 2),
                ("Turkmen", 1),
                ("Gilaki", 2),
                ("Mazandarani", 1),
                ("Qashqai", 1),
            ]),
            language_by_ethnicity,
            religion_by_ethnicity,
            default_religion: weighted(&[
                ("Shia Muslim", 85),
                ("Sunni Muslim", 10),
                ("Zoroastrian", 2),
                ("Christian", 2),
                ("Jewish", 1),
            ]),
        }
    }
}

/// A validated categorical distribution ready to draw from.
#[derive(Debug, Clone)]
struct Categorical {
    values: Vec<String>,
    index: WeightedIndex<u32>,
}

impl Categorical {
    fn new(name: &str, entries: &[Weighted]) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Err(AppError::configuration(format!(
                "distribution '{name}' has no entries"
            )));
        }
        if let Some(bad) = entries.iter().find(|e| e.weight == 0) {
            return Err(AppError::configuration(format!(
                "distribution '{name}' has non-positive weight for '{}'",
                bad.value
            )));
        }
        let index = WeightedIndex::new(entries.iter().map(|e| e.weight))
            .map_err(|e| AppError::configuration(format!("distribution '{name}': {e}")))?;
        Ok(Self {
            values: entries.iter().map(|e| e.value.clone()).collect(),
            index,
        })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.values[self.index.sample(rng)]
    }
}

pub struct BaseSampler {
    gender: Categorical,
    age_bands: Vec<AgeBand>,
    age_index: WeightedIndex<u32>,
    marital_status: Categorical,
    children: Categorical,
    living_situation: Categorical,
    ethnicity: Categorical,
    language_by_ethnicity: HashMap<String, String>,
    religion_by_ethnicity: HashMap<String, Categorical>,
    default_religion: Option<Categorical>,
}

impl BaseSampler {
    /// Validates the table. Any non-positive weight, empty distribution,
    /// inverted age band, or ethnicity without a language or religion
    /// distribution is a configuration error.
    pub fn new(table: &DistributionTable) -> Result<Self, AppError> {
        if table.age_bands.is_empty() {
            return Err(AppError::configuration("distribution 'age' has no bands"));
        }
        for band in &table.age_bands {
            if band.weight == 0 {
                return Err(AppError::configuration(format!(
                    "age band {}-{} has non-positive weight",
                    band.min, band.max
                )));
            }
            if band.min > band.max {
                return Err(AppError::configuration(format!(
                    "age band {}-{} is inverted",
                    band.min, band.max
                )));
            }
        }
        let age_index = WeightedIndex::new(table.age_bands.iter().map(|b| b.weight))
            .map_err(|e| AppError::configuration(format!("distribution 'age': {e}")))?;

        let ethnicity = Categorical::new("ethnicity", &table.ethnicity)?;

        let mut religion_by_ethnicity = HashMap::new();
        for (eth, entries) in &table.religion_by_ethnicity {
            religion_by_ethnicity.insert(
                eth.clone(),
                Categorical::new(&format!("religion[{eth}]"), entries)?,
            );
        }
        let default_religion = if table.default_religion.is_empty() {
            None
        } else {
            Some(Categorical::new("religion", &table.default_religion)?)
        };

        for eth in &ethnicity.values {
            if !table.language_by_ethnicity.contains_key(eth) {
                return Err(AppError::configuration(format!(
                    "ethnicity '{eth}' has no language mapping"
                )));
            }
            if !religion_by_ethnicity.contains_key(eth) && default_religion.is_none() {
                return Err(AppError::configuration(format!(
                    "ethnicity '{eth}' has no religion distribution"
                )));
            }
        }

        Ok(Self {
            gender: Categorical::new("gender", &table.gender)?,
            age_bands: table.age_bands.clone(),
            age_index,
            marital_status: Categorical::new("marital_status", &table.marital_status)?,
            children: Categorical::new("children", &table.children)?,
            living_situation: Categorical::new("living_situation", &table.living_situation)?,
            ethnicity,
            language_by_ethnicity: table.language_by_ethnicity.clone(),
            religion_by_ethnicity,
            default_religion,
        })
    }

    /// Draws one base persona.
    #[allow(dead_code)]
    pub fn sample_base_persona(&self, seed: Option<u64>) -> BaseFields {
        let mut rng = rng_for(seed);
        self.draw(&mut rng)
    }

    /// Draws `count` base personas from a single RNG stream, so a whole run is
    /// reproducible from one seed.
    pub fn sample_many(&self, count: usize, seed: Option<u64>) -> Vec<BaseFields> {
        let mut rng = rng_for(seed);
        (0..count).map(|_| self.draw(&mut rng)).collect()
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> BaseFields {
        let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        let gender = self.gender.draw(rng).to_string();
        let band = self.age_bands[self.age_index.sample(rng)];
        let age = rng.gen_range(band.min..=band.max);
        let marital_status = self.marital_status.draw(rng).to_string();
        let children = self.children.draw(rng).to_string();
        let living_situation = self.living_situation.draw(rng).to_string();
        let ethnicity = self.ethnicity.draw(rng).to_string();

        // Both lookups were checked for every ethnicity in `new`.
        let language = self
            .language_by_ethnicity
            .get(&ethnicity)
            .cloned()
            .unwrap_or_default();
        let religion_and_sect = self
            .religion_by_ethnicity
            .get(&ethnicity)
            .or(self.default_religion.as_ref())
            .map(|d| d.draw(rng).to_string())
            .unwrap_or_default();

        BaseFields {
            id: short_id(id),
            age,
            gender,
            marital_status,
            children,
            living_situation,
            ethnicity,
            language,
            religion_and_sect,
        }
    }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// First 12 hex digits of the uuid; short enough for file names.
fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..12].to_string()
}
