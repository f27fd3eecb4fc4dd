use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ADDRESS_SOURCE_SHIPPING_PAGE: &str = "shipping-page";

/// One persisted session cookie. `expires` is a unix timestamp; zero or
/// negative marks a session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub expires: i64,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: String,
}

impl StoredCookie {
    #[must_use]
    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        self.expires > 0 && self.expires < now_unix
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub floor: String,
    pub address1: String,
    pub address2: String,
    pub near_by_landmark: String,
    pub city: String,
    pub state_code: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub latitude: String,
    pub longitude: String,
}

impl Address {
    /// True when every field the shipping form requires is non-empty.
    /// Optional fields (last name, second line, floor, landmark, coordinates)
    /// never affect the result.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.first_name,
            &self.address1,
            &self.city,
            &self.state_code,
            &self.postal_code,
            &self.country,
            &self.phone,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// The subset of fields the saved-address location call needs.
    #[must_use]
    pub fn ready_for_location(&self) -> bool {
        [
            &self.address1,
            &self.city,
            &self.state_code,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOrder {
    pub order_id: String,
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub total_price: String,
}

/// A named account configuration. One JSON file per profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub address_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preferred_city: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_order: Option<LastOrder>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address_source: String,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cookies: Vec::new(),
            address_id: String::new(),
            address: None,
            preferred_city: String::new(),
            phone_number: String::new(),
            last_login: None,
            last_order: None,
            address_source: String::new(),
        }
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// The saved address together with its server-side identifier, if both exist.
    #[must_use]
    pub fn saved_address(&self) -> Option<(&Address, &str)> {
        match &self.address {
            Some(address) if !self.address_id.trim().is_empty() => {
                Some((address, self.address_id.as_str()))
            }
            _ => None,
        }
    }

    /// Replaces the session wholesale after a (re)login. Address, city and
    /// order data are preserved; the phone is only overwritten when one was
    /// used for the login.
    pub fn replace_session(
        &mut self,
        cookies: Vec<StoredCookie>,
        phone: Option<&str>,
        now: DateTime<Utc>,
    ) {
        self.cookies = cookies;
        if let Some(phone) = phone.filter(|p| !p.is_empty()) {
            self.phone_number = phone.to_string();
        }
        self.last_login = Some(now);
    }

    pub fn clear_session(&mut self) {
        self.cookies.clear();
    }
}
