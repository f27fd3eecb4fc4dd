//! Address reconciliation: pick a scraped address, fill gaps from the
//! operator, and normalise state and country.

use std::sync::LazyLock;

use bisleri_client::extract::AddressCandidate;
use bisleri_core::{choose, Address, Profile, PromptError, Prompter};
use regex::Regex;

pub const DEFAULT_COUNTRY: &str = "IN";

static STATE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\b").expect("valid regex"));

/// Infers a two-letter state code from the first address line when the
/// stored one is not already two characters. `IN` is never taken as a state.
pub fn normalize_state_code(address: &mut Address) {
    if address.state_code.trim().chars().count() == 2 || address.address1.is_empty() {
        return;
    }
    if let Some(code) = STATE_CODE
        .find_iter(&address.address1)
        .map(|m| m.as_str())
        .find(|m| *m != DEFAULT_COUNTRY)
    {
        address.state_code = code.to_string();
    }
}

/// The saved address adjusted for a location-set call, or `None` when the
/// profile has no saved address or it lacks location fields.
#[must_use]
pub fn location_address(profile: &Profile) -> Option<(Address, String)> {
    let (saved, id) = profile.saved_address()?;
    let mut address = saved.clone();
    let preferred = profile.preferred_city.trim();
    if !preferred.is_empty() {
        address.city = preferred.to_string();
    }
    normalize_state_code(&mut address);
    if address.country.trim().is_empty() {
        address.country = DEFAULT_COUNTRY.to_string();
    }
    address
        .ready_for_location()
        .then(|| (address, id.to_string()))
}

/// The sole candidate, else the one marked default, else the operator's
/// choice.
///
/// # Errors
///
/// Propagates prompt failures. Callers must not pass an empty slice.
pub async fn select_address<P: Prompter>(
    prompter: &P,
    candidates: &[AddressCandidate],
) -> Result<AddressCandidate, PromptError> {
    if let [only] = candidates {
        return Ok(only.clone());
    }
    if let Some(default) = candidates.iter().find(|c| c.is_default) {
        return Ok(default.clone());
    }
    let labels: Vec<String> = candidates.iter().map(|c| c.label().to_string()).collect();
    let index = choose(
        prompter,
        "Multiple addresses found. Which address should be set as default?",
        &labels,
    )
    .await?;
    Ok(candidates[index].clone())
}

/// Prompts for every empty field, required ones first in form order and the
/// optional ones labelled as such. Country defaults to `IN` instead of
/// being asked.
///
/// # Errors
///
/// Propagates prompt failures.
pub async fn ensure_complete<P: Prompter>(prompter: &P, address: &mut Address) -> Result<(), PromptError> {
    async fn fill<P: Prompter>(prompter: &P, label: &str, field: &mut String) -> Result<(), PromptError> {
        if field.trim().is_empty() {
            *field = prompter.ask(label).await?;
        }
        Ok(())
    }

    fill(prompter, "First name", &mut address.first_name).await?;
    fill(prompter, "Last name", &mut address.last_name).await?;
    fill(prompter, "Address line 1", &mut address.address1).await?;
    fill(prompter, "Address line 2 (optional)", &mut address.address2).await?;
    fill(prompter, "Floor (optional)", &mut address.floor).await?;
    fill(prompter, "Landmark (optional)", &mut address.near_by_landmark).await?;
    fill(prompter, "City", &mut address.city).await?;
    fill(prompter, "State code (e.g. KA)", &mut address.state_code).await?;
    fill(prompter, "Postal code", &mut address.postal_code).await?;
    fill(prompter, "Phone", &mut address.phone).await?;
    if address.country.trim().is_empty() {
        address.country = DEFAULT_COUNTRY.to_string();
    }
    fill(prompter, "Latitude (optional)", &mut address.latitude).await?;
    fill(prompter, "Longitude (optional)", &mut address.longitude).await?;
    Ok(())
}
