//! Built-in industry templates.

use crate::types::{FormField, Industry};

/// Immutable registry of the industry templates offered when creating a persona.
pub struct IndustryCatalog {
    industries: Vec<Industry>,
}

impl IndustryCatalog {
    /// The templates shipped with the application
    pub fn builtin() -> Self {
        Self {
            industries: vec![
                real_estate(),
                fitness(),
                healthcare(),
                legal(),
                custom(),
            ],
        }
    }

    pub fn all(&self) -> &[Industry] {
        &self.industries
    }

    pub fn get(&self, id: &str) -> Option<&Industry> {
        self.industries.iter().find(|i| i.id == id)
    }

    /// Case-insensitive lookup by id or display name
    pub fn find(&self, id_or_name: &str) -> Option<&Industry> {
        let needle = id_or_name.trim().to_lowercase();
        self.industries
            .iter()
            .find(|i| i.id == needle || i.name.to_lowercase() == needle)
    }
}

impl Default for IndustryCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn real_estate() -> Industry {
    Industry {
        id: "real-estate".to_string(),
        name: "Real Estate".to_string(),
        icon: "🏠".to_string(),
        description: "Property sales, rentals, and real estate services".to_string(),
        suggested_fields: vec![
            FormField::select(
                "specialty",
                "Specialty",
                &[
                    ("residential", "Residential"),
                    ("commercial", "Commercial"),
                    ("luxury", "Luxury"),
                    ("rentals", "Rentals"),
                ],
            ),
            FormField::select(
                "tone",
                "Communication Tone",
                &[
                    ("professional", "Professional"),
                    ("friendly", "Friendly & Approachable"),
                    ("luxury", "Luxury & Exclusive"),
                ],
            ),
            FormField::text("targetAudience", "Target Audience")
                .with_placeholder("e.g., First-time homebuyers, investors"),
        ],
    }
}

fn fitness() -> Industry {
    Industry {
        id: "fitness".to_string(),
        name: "Fitness".to_string(),
        icon: "💪".to_string(),
        description: "Personal training, wellness, and fitness coaching".to_string(),
        suggested_fields: vec![
            FormField::select(
                "specialty",
                "Specialty",
                &[
                    ("personal-training", "Personal Training"),
                    ("nutrition", "Nutrition Coaching"),
                    ("yoga", "Yoga & Mindfulness"),
                    ("sports", "Sports Performance"),
                ],
            ),
            FormField::select(
                "tone",
                "Coaching Style",
                &[
                    ("motivational", "Motivational & Energetic"),
                    ("supportive", "Supportive & Understanding"),
                    ("strict", "Disciplined & Direct"),
                ],
            ),
            FormField::text("targetAudience", "Target Clients")
                .with_placeholder("e.g., Beginners, athletes, seniors"),
        ],
    }
}

fn healthcare() -> Industry {
    Industry {
        id: "healthcare".to_string(),
        name: "Healthcare".to_string(),
        icon: "🏥".to_string(),
        description: "Medical practices, clinics, and health services".to_string(),
        suggested_fields: vec![
            FormField::text("specialty", "Medical Specialty")
                .with_placeholder("e.g., General Practice, Dermatology"),
            FormField::select(
                "tone",
                "Communication Style",
                &[
                    ("empathetic", "Empathetic & Caring"),
                    ("informative", "Informative & Educational"),
                    ("professional", "Clinical & Professional"),
                ],
            ),
            FormField::textarea("compliance", "Compliance Notes")
                .with_placeholder("Any specific compliance requirements..."),
        ],
    }
}

fn legal() -> Industry {
    Industry {
        id: "legal".to_string(),
        name: "Legal".to_string(),
        icon: "⚖️".to_string(),
        description: "Law firms and legal services".to_string(),
        suggested_fields: vec![
            FormField::text("specialty", "Practice Area")
                .with_placeholder("e.g., Family Law, Corporate Law"),
            FormField::select(
                "tone",
                "Communication Style",
                &[
                    ("formal", "Formal & Authoritative"),
                    ("accessible", "Accessible & Clear"),
                ],
            ),
            FormField::text("jurisdiction", "Jurisdiction")
                .with_placeholder("e.g., California, Federal"),
        ],
    }
}

fn custom() -> Industry {
    Industry {
        id: "custom".to_string(),
        name: "Custom".to_string(),
        icon: "✨".to_string(),
        description: "Build a custom persona from scratch".to_string(),
        suggested_fields: vec![],
    }
}
