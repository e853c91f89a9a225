//! Specialist directory
//!
//! Static table of dermatologists. A geolocation-backed lookup would replace
//! this; callers only see `all` and `in_city`.

use serde::Serialize;

/// A specialist entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Specialist {
    /// Full name
    pub name: &'static str,
    /// City of practice
    pub city: &'static str,
    /// Specialty
    pub specialty: &'static str,
    /// Street address
    pub address: &'static str,
}

const SPECIALISTS: [Specialist; 5] = [
    Specialist {
        name: "Dr. Priya Sharma",
        city: "Mumbai",
        specialty: "Dermatologist",
        address: "123 Skin Care Ave, Andheri",
    },
    Specialist {
        name: "Dr. Rohan Verma",
        city: "Delhi",
        specialty: "Dermatologist",
        address: "456 Derma Clinic, Connaught Place",
    },
    Specialist {
        name: "Dr. Anjali Rao",
        city: "Bengaluru",
        specialty: "Cosmetic Dermatologist",
        address: "789 Glow St, Koramangala",
    },
    Specialist {
        name: "Dr. Vikram Singh",
        city: "Chennai",
        specialty: "Pediatric Dermatologist",
        address: "101 Child Health Rd, T. Nagar",
    },
    Specialist {
        name: "Dr. Sunita Reddy",
        city: "Hyderabad",
        specialty: "Dermatopathologist",
        address: "212 Bio Labs, Gachibowli",
    },
];

/// Every specialist in the directory
pub fn all() -> &'static [Specialist] {
    &SPECIALISTS
}

/// Specialists practising in `city` (case-insensitive)
pub fn in_city(city: &str) -> Vec<Specialist> {
    let city = city.trim();
    SPECIALISTS
        .iter()
        .filter(|s| s.city.eq_ignore_ascii_case(city))
        .copied()
        .collect()
}
