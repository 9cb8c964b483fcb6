use super::super::domain::{CategoryId, DetailValue};

/// Sustainability predicate applied to a single answer.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Predicate {
    /// Normalized keyword must be one of the listed values.
    OneOf(&'static [&'static str]),
    /// Numeric answer must not exceed the bound.
    AtMost(f64),
    /// Yes/true style answer.
    Affirmative,
}

impl Predicate {
    pub(crate) fn is_sustainable(&self, value: &DetailValue) -> bool {
        match self {
            Predicate::OneOf(accepted) => {
                let keyword = value.as_keyword();
                accepted.iter().any(|candidate| *candidate == keyword)
            }
            Predicate::AtMost(limit) => value
                .as_number()
                .map(|number| number <= *limit)
                .unwrap_or(false),
            Predicate::Affirmative => value.is_affirmative(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct QuestionRule {
    pub(crate) key: &'static str,
    pub(crate) predicate: Predicate,
}

const TRANSPORTATION: &[QuestionRule] = &[
    QuestionRule {
        key: "transport_primary_mode",
        predicate: Predicate::OneOf(&[
            "walking",
            "cycling",
            "bicycle",
            "public_transit",
            "bus",
            "train",
            "electric_vehicle",
            "carpool",
        ]),
    },
    QuestionRule {
        key: "commute_distance",
        predicate: Predicate::AtMost(10.0),
    },
    QuestionRule {
        key: "flights_per_year",
        predicate: Predicate::AtMost(2.0),
    },
];

const ENERGY_USAGE: &[QuestionRule] = &[
    QuestionRule {
        key: "renewable_energy",
        predicate: Predicate::Affirmative,
    },
    QuestionRule {
        key: "thermostat_setting",
        predicate: Predicate::AtMost(20.0),
    },
    QuestionRule {
        key: "led_lighting",
        predicate: Predicate::OneOf(&["yes", "true", "all", "most"]),
    },
    QuestionRule {
        key: "appliance_efficiency",
        predicate: Predicate::OneOf(&["high", "energy_star", "a+"]),
    },
];

const WATER_USAGE: &[QuestionRule] = &[
    QuestionRule {
        key: "shower_duration",
        predicate: Predicate::AtMost(5.0),
    },
    QuestionRule {
        key: "low_flow_fixtures",
        predicate: Predicate::Affirmative,
    },
    QuestionRule {
        key: "garden_watering",
        predicate: Predicate::OneOf(&["none", "drip", "rainwater"]),
    },
    QuestionRule {
        key: "full_loads_only",
        predicate: Predicate::Affirmative,
    },
];

const WASTE_MANAGEMENT: &[QuestionRule] = &[
    QuestionRule {
        key: "recycling_frequency",
        predicate: Predicate::OneOf(&["always", "often"]),
    },
    QuestionRule {
        key: "composting",
        predicate: Predicate::Affirmative,
    },
    QuestionRule {
        key: "single_use_plastics",
        predicate: Predicate::OneOf(&["never", "rarely"]),
    },
];

const FOOD_CONSUMPTION: &[QuestionRule] = &[
    QuestionRule {
        key: "meat_frequency",
        predicate: Predicate::OneOf(&["never", "rarely", "weekly"]),
    },
    QuestionRule {
        key: "local_produce",
        predicate: Predicate::OneOf(&["always", "often"]),
    },
    QuestionRule {
        key: "food_waste",
        predicate: Predicate::OneOf(&["none", "little"]),
    },
];

pub(crate) fn rules_for(category: CategoryId) -> &'static [QuestionRule] {
    match category {
        CategoryId::Transportation => TRANSPORTATION,
        CategoryId::EnergyUsage => ENERGY_USAGE,
        CategoryId::WaterUsage => WATER_USAGE,
        CategoryId::WasteManagement => WASTE_MANAGEMENT,
        CategoryId::FoodConsumption => FOOD_CONSUMPTION,
    }
}

/// Category whose question table owns `key`.
pub(crate) fn category_for_question(key: &str) -> Option<CategoryId> {
    CategoryId::ordered()
        .into_iter()
        .find(|category| rules_for(*category).iter().any(|rule| rule.key == key))
}
