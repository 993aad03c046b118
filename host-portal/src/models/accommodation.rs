use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use super::{null_as_default, timestamp};

/// Lowest nightly price the backend accepts.
pub const MIN_PRICE_PER_NIGHT: i64 = 10_000;

/// Amenities offered on the registration form.
pub const AMENITIES: &[&str] = &[
    "Wireless internet",
    "Kitchen",
    "Washer",
    "Dryer",
    "Air conditioning",
    "Heating",
    "TV",
    "Hair dryer",
    "Iron",
    "Dedicated workspace",
    "Free parking",
    "Pool",
    "Hot tub",
    "BBQ grill",
    "Outdoor dining area",
    "Smoke alarm",
    "Carbon monoxide alarm",
    "First aid kit",
    "Fire extinguisher",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccommodationStatus {
    Pending,
    Approved,
    Rejected,
}

impl AccommodationStatus {
    pub fn label(self) -> &'static str {
        match self {
            AccommodationStatus::Pending => "Awaiting approval",
            AccommodationStatus::Approved => "Approved",
            AccommodationStatus::Rejected => "Rejected",
        }
    }

    /// A host may edit and resubmit anything that is not yet approved.
    pub fn accepts_resubmission(self) -> bool {
        !matches!(self, AccommodationStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    #[serde(default)]
    pub id: Option<i64>,
    pub photo_url: String,
}

/// An accommodation application owned by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
    pub id: i64,
    #[serde(default)]
    pub host_id: Option<i64>,
    pub status: AccommodationStatus,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub detail_address: String,
    #[serde(default)]
    pub price_per_night: i64,
    #[serde(default)]
    pub bedroom_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,
    #[serde(default, alias = "createdAt", with = "timestamp::option")]
    pub submitted_at: Option<NaiveDateTime>,
    #[serde(default, with = "timestamp::option")]
    pub processed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl Accommodation {
    pub fn address(&self) -> String {
        [&self.city, &self.district, &self.detail_address]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A pending accommodation as listed for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAccommodation {
    #[serde(flatten)]
    pub accommodation: Accommodation,
    #[serde(default)]
    pub host_email: String,
    #[serde(default)]
    pub host_name: String,
}

/// The accommodation registration form, shared by create and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationForm {
    #[validate(length(min = 1, message = "Please enter the accommodation name"))]
    pub name: String,
    #[validate(length(min = 1, message = "Please select a city"))]
    pub city: String,
    #[validate(length(min = 1, message = "Please select a district"))]
    pub district: String,
    #[validate(length(min = 1, message = "Please enter the detailed address"))]
    pub detail_address: String,
    #[validate(range(min = 10000, message = "The nightly price must be at least 10,000"))]
    pub price_per_night: i64,
    #[validate(range(min = 1, message = "Please choose the number of bedrooms"))]
    pub bedroom_count: u32,
    #[validate(length(min = 1, message = "Please select at least one amenity"))]
    pub amenities: Vec<String>,
    #[serde(rename = "photoUrls")]
    #[validate(length(min = 1, message = "Please add at least one photo"))]
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
}

impl Default for AccommodationForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            city: String::new(),
            district: String::new(),
            detail_address: String::new(),
            price_per_night: MIN_PRICE_PER_NIGHT,
            bedroom_count: 1,
            amenities: Vec::new(),
            photos: Vec::new(),
            extra_info: None,
        }
    }
}

impl AccommodationForm {
    /// Build the form from urlencoded pairs. Checkbox groups repeat their key,
    /// photo references may also arrive one per line in a textarea. Numbers
    /// that fail to parse become zero and are caught by validation.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self {
            price_per_night: 0,
            bedroom_count: 0,
            ..Self::default()
        };

        for (key, value) in pairs {
            match key.as_str() {
                "name" => form.name = value,
                "city" => form.city = value,
                "district" => form.district = value,
                "detailAddress" => form.detail_address = value,
                "pricePerNight" => form.price_per_night = value.trim().parse().unwrap_or(0),
                "bedroomCount" => form.bedroom_count = value.trim().parse().unwrap_or(0),
                "amenities" => form.amenities.push(value),
                "photos" => form
                    .photos
                    .extend(value.lines().map(str::to_string)),
                "extraInfo" => form.extra_info = Some(value),
                _ => {}
            }
        }

        form
    }

    /// Prefill an edit form from an existing application.
    pub fn from_accommodation(accommodation: &Accommodation) -> Self {
        Self {
            name: accommodation.name.clone(),
            city: accommodation.city.clone(),
            district: accommodation.district.clone(),
            detail_address: accommodation.detail_address.clone(),
            price_per_night: accommodation.price_per_night,
            bedroom_count: accommodation.bedroom_count,
            amenities: accommodation.amenities.iter().cloned().collect(),
            photos: accommodation
                .photos
                .iter()
                .map(|photo| photo.photo_url.clone())
                .collect(),
            extra_info: accommodation.extra_info.clone(),
        }
    }

    /// Trim text, drop blank list entries and duplicate amenities, and treat
    /// blank extra info as absent.
    pub fn normalized(self) -> Self {
        let mut amenities: Vec<String> = Vec::new();
        for amenity in self.amenities {
            let amenity = amenity.trim().to_string();
            if !amenity.is_empty() && !amenities.contains(&amenity) {
                amenities.push(amenity);
            }
        }

        Self {
            name: self.name.trim().to_string(),
            city: self.city.trim().to_string(),
            district: self.district.trim().to_string(),
            detail_address: self.detail_address.trim().to_string(),
            price_per_night: self.price_per_night,
            bedroom_count: self.bedroom_count,
            amenities,
            photos: self
                .photos
                .into_iter()
                .map(|photo| photo.trim().to_string())
                .filter(|photo| !photo.is_empty())
                .collect(),
            extra_info: self
                .extra_info
                .map(|info| info.trim().to_string())
                .filter(|info| !info.is_empty()),
        }
    }

    pub fn photos_text(&self) -> String {
        self.photos.join("\n")
    }

    pub fn has_amenity(&self, amenity: &str) -> bool {
        self.amenities.iter().any(|a| a == amenity)
    }
}
