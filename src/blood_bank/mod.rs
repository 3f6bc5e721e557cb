/// Blood bank registry
///
/// Bank profiles with geolocation and weekly opening hours, the eight-slot
/// stock counter, staff logins and the bank's notification inbox.

mod manager;

pub use manager::BloodBankManager;

use crate::{
    blood::{BloodStock, BloodType},
    validation,
};
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Address placeholder stored until staff complete the profile
pub const ADDRESS_PLACEHOLDER: &str = "To be updated";

/// Default search radius for `nearby`, in kilometres
pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const MAX_RADIUS_KM: f64 = 500.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic point, exchanged as `[lng, lat]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.lng, p.lat]
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// The unset `[0, 0]` placeholder
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Latitude/longitude window containing every point within `radius_km`
    pub fn bounding_box(&self, radius_km: f64) -> GeoBox {
        let angular = radius_km / EARTH_RADIUS_KM;
        let min_lat = self.lat - angular.to_degrees();
        let max_lat = self.lat + angular.to_degrees();

        // A pole inside the circle means every meridian crosses it
        let full = GeoBox {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            west: -180.0,
            east: 180.0,
        };
        if min_lat <= -90.0 || max_lat >= 90.0 {
            return full;
        }

        let spread = angular.sin() / self.lat.to_radians().cos();
        if spread >= 1.0 {
            return full;
        }
        let d_lng = spread.asin().to_degrees();

        let mut west = self.lng - d_lng;
        let mut east = self.lng + d_lng;
        if west < -180.0 {
            west += 360.0;
        }
        if east > 180.0 {
            east -= 360.0;
        }

        GeoBox {
            west,
            east,
            ..full
        }
    }
}

/// Search window for a radius query
///
/// `west > east` when the window crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub west: f64,
    pub east: f64,
}

impl GeoBox {
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        let lat_ok = (self.min_lat..=self.max_lat).contains(&point.lat);
        let lng_ok = if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            (self.west..=self.east).contains(&point.lng)
        };
        lat_ok && lng_ok
    }
}

/// Opening hours of one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DayHours {
    #[validate(custom(function = "validation::clock_time"))]
    pub open: String,
    #[validate(custom(function = "validation::clock_time"))]
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

impl DayHours {
    fn open_between(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
            closed: false,
        }
    }

    fn closed_all_day() -> Self {
        Self {
            closed: true,
            ..Self::open_between("00:00", "00:00")
        }
    }

    fn times(&self) -> Option<(NaiveTime, NaiveTime)> {
        if self.closed {
            return None;
        }
        Some((
            validation::parse_clock_time(&self.open)?,
            validation::parse_clock_time(&self.close)?,
        ))
    }

    /// Whether `close <= open`, i.e. the day runs past midnight
    fn spans_midnight(&self) -> bool {
        matches!(self.times(), Some((open, close)) if close <= open)
    }
}

/// Weekly opening hours, Monday through Sunday
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OperatingHours {
    #[validate(nested)]
    pub monday: DayHours,
    #[validate(nested)]
    pub tuesday: DayHours,
    #[validate(nested)]
    pub wednesday: DayHours,
    #[validate(nested)]
    pub thursday: DayHours,
    #[validate(nested)]
    pub friday: DayHours,
    #[validate(nested)]
    pub saturday: DayHours,
    #[validate(nested)]
    pub sunday: DayHours,
}

impl Default for OperatingHours {
    /// Monday to Saturday 09:00-17:00, closed on Sunday
    fn default() -> Self {
        let weekday = DayHours::open_between("09:00", "17:00");
        Self {
            monday: weekday.clone(),
            tuesday: weekday.clone(),
            wednesday: weekday.clone(),
            thursday: weekday.clone(),
            friday: weekday.clone(),
            saturday: weekday,
            sunday: DayHours::closed_all_day(),
        }
    }
}

impl OperatingHours {
    pub fn day(&self, weekday: Weekday) -> &DayHours {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Whether the bank is open at `time` on `weekday`
    ///
    /// Hours whose close is not after their open run past midnight into the
    /// next day.
    pub fn is_open_at(&self, weekday: Weekday, time: NaiveTime) -> bool {
        let today = self.day(weekday);
        let open_today = match today.times() {
            Some((open, close)) if close > open => time >= open && time < close,
            Some((open, _)) => time >= open,
            None => false,
        };
        if open_today {
            return true;
        }

        let yesterday = self.day(weekday.pred());
        match yesterday.times() {
            Some((_, close)) if yesterday.spans_midnight() => time < close,
            _ => false,
        }
    }
}

/// Required street address of a blood bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankAddress {
    #[validate(custom(function = "validation::not_blank", message = "Street is required"))]
    pub street: String,
    #[validate(custom(function = "validation::not_blank", message = "City is required"))]
    pub city: String,
    #[validate(custom(function = "validation::not_blank", message = "State is required"))]
    pub state: String,
    #[validate(custom(function = "validation::not_blank", message = "Zip code is required"))]
    pub zip_code: String,
}

impl BankAddress {
    pub fn placeholder() -> Self {
        Self {
            street: ADDRESS_PLACEHOLDER.to_string(),
            city: ADDRESS_PLACEHOLDER.to_string(),
            state: ADDRESS_PLACEHOLDER.to_string(),
            zip_code: "000000".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.street == ADDRESS_PLACEHOLDER || self.city == ADDRESS_PLACEHOLDER
    }
}

/// Blood bank record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodBank {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: BankAddress,
    pub location: GeoPoint,
    pub operating_hours: OperatingHours,
    pub stock: BloodStock,
    pub is_verified: bool,
    pub is_active: bool,
    pub profile_completed: bool,
    pub last_stock_update: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodBank {
    pub fn is_open_at(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.operating_hours.is_open_at(weekday, time)
    }

    /// Evaluate opening hours against a wall-clock time
    pub fn is_currently_open(&self, now: NaiveDateTime) -> bool {
        self.is_open_at(now.weekday(), now.time())
    }

    pub fn total_units(&self) -> u64 {
        self.stock.total_units()
    }

    pub fn low_stock_types(&self, threshold: u32) -> Vec<BloodType> {
        self.stock.low_stock_types(threshold)
    }
}

/// Admin request creating a bank with placeholder profile
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBloodBankRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Name is required"),
        length(max = 200, message = "Name must be at most 200 characters")
    )]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    pub password: String,
    #[validate(custom(function = "validation::not_blank", message = "License number is required"))]
    pub license_number: String,
    #[validate(custom(function = "validation::phone"))]
    pub phone: Option<String>,
}

/// Profile completion / update by staff or an admin
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBloodBankRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Name must not be empty"),
        length(max = 200, message = "Name must be at most 200 characters")
    )]
    pub name: Option<String>,
    #[validate(custom(function = "validation::phone"))]
    pub phone: Option<String>,
    #[validate(url(message = "Website must be a URL"))]
    pub website: Option<String>,
    #[validate(nested)]
    pub address: Option<BankAddress>,
    #[validate(custom(function = "valid_location"))]
    pub location: Option<GeoPoint>,
    #[validate(nested)]
    pub operating_hours: Option<OperatingHours>,
}

fn valid_location(point: &GeoPoint) -> Result<(), ValidationError> {
    if point.is_valid() {
        Ok(())
    } else {
        let mut err = ValidationError::new("location");
        err.message = Some("Location must be [lng, lat] within valid ranges".into());
        Err(err)
    }
}

/// Successful staff login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankLoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub blood_bank: BloodBank,
}

/// Stock mutation request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateRequest {
    pub blood_type: String,
    pub quantity: i64,
    pub operation: String,
}

/// Result of a stock mutation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub blood_type: BloodType,
    pub operation: crate::blood::StockOperation,
    pub quantity: u32,
    pub units: u32,
    pub updated_at: DateTime<Utc>,
}

/// Stock view with aggregations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub stock: BloodStock,
    pub total_units: u64,
    pub threshold: u32,
    pub low_stock_types: Vec<BloodType>,
    pub last_stock_update: Option<DateTime<Utc>>,
}

impl StockSummary {
    pub fn of(bank: &BloodBank, threshold: u32) -> Self {
        Self {
            stock: bank.stock.clone(),
            total_units: bank.total_units(),
            threshold,
            low_stock_types: bank.low_stock_types(threshold),
            last_stock_update: bank.last_stock_update,
        }
    }
}

/// Public listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodBankFilter {
    pub city: Option<String>,
    pub state: Option<String>,
    /// Only banks holding at least one unit of this type
    pub blood_type: Option<String>,
    pub search: Option<String>,
    pub verified: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A bank with its distance from the query point
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyBloodBank {
    #[serde(flatten)]
    pub bank: BloodBank,
    pub distance_km: f64,
}

/// Entry in a bank's inbox
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankNotification {
    pub id: String,
    pub blood_bank_id: String,
    pub request_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Counts for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodBankStats {
    pub total: i64,
    pub active: i64,
    pub verified: i64,
    pub total_units: i64,
}
