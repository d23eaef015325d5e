//! Static nearby-care directory.
//!
//! A fixed, display-only list of facilities shown next to results so a
//! YELLOW or RED verdict always comes with somewhere concrete to go.
//! Entries are seed data for the default deployment area; they are not
//! fetched, ranked, or verified against the grounded reasoning stage.

use serde::{Deserialize, Serialize};

/// One care facility as rendered on the results screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub name: String,
    /// Facility category ("PHC", "Clinic", "Hospital", "Pharmacy").
    #[serde(rename = "type")]
    pub category: String,
    pub hours: String,
    pub phone: String,
    /// Human-readable distance from the deployment site.
    pub distance: String,
    pub lat: f64,
    pub lng: f64,
}

/// The seeded facility list, nearest first.
pub fn nearby_facilities() -> Vec<Facility> {
    vec![
        Facility {
            name: "Aam Aadmi Mohalla Clinic, Chandni Chowk".to_string(),
            category: "Clinic".to_string(),
            hours: "8 AM - 2 PM".to_string(),
            phone: "+91 11 2326 4455".to_string(),
            distance: "0.8 km".to_string(),
            lat: 28.6562,
            lng: 77.2301,
        },
        Facility {
            name: "Daryaganj Primary Health Centre".to_string(),
            category: "PHC".to_string(),
            hours: "9 AM - 5 PM".to_string(),
            phone: "+91 11 2327 8190".to_string(),
            distance: "1.4 km".to_string(),
            lat: 28.6419,
            lng: 77.2431,
        },
        Facility {
            name: "Jeevan Jyoti Pharmacy".to_string(),
            category: "Pharmacy".to_string(),
            hours: "Open 24 hours".to_string(),
            phone: "+91 11 2325 6677".to_string(),
            distance: "1.6 km".to_string(),
            lat: 28.6488,
            lng: 77.2370,
        },
        Facility {
            name: "Lok Nayak Hospital".to_string(),
            category: "Hospital".to_string(),
            hours: "Open 24 hours".to_string(),
            phone: "+91 11 2323 2400".to_string(),
            distance: "2.1 km".to_string(),
            lat: 28.6392,
            lng: 77.2406,
        },
        Facility {
            name: "Sushruta Family Clinic, Kashmere Gate".to_string(),
            category: "Clinic".to_string(),
            hours: "10 AM - 8 PM".to_string(),
            phone: "+91 11 2396 1822".to_string(),
            distance: "2.7 km".to_string(),
            lat: 28.6675,
            lng: 77.2285,
        },
    ]
}
