//! Delivery-city selection.

use bisleri_core::{parse_index, Profile, PromptError, Prompter};

const ALIASES: [(&str, &str); 5] = [
    ("bangalore", "bengaluru"),
    ("bengaluru", "bangalore"),
    ("gurgaon", "gurugram"),
    ("gurugram", "gurgaon"),
    ("bombay", "mumbai"),
];

/// Matches free text against the site's city options: exact
/// (case-insensitive), then a known alternate spelling, then containment in
/// either direction when exactly one option qualifies.
#[must_use]
pub fn match_city(candidate: &str, options: &[String]) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() || options.is_empty() {
        return None;
    }
    if let Some(exact) = options.iter().find(|o| o.eq_ignore_ascii_case(candidate)) {
        return Some(exact.clone());
    }

    let lower = candidate.to_lowercase();
    let alias = ALIASES
        .iter()
        .find(|(from, _)| *from == lower)
        .and_then(|(_, to)| options.iter().find(|o| o.eq_ignore_ascii_case(to)));
    if let Some(alias) = alias {
        return Some(alias.clone());
    }

    let mut contained = options.iter().filter(|o| {
        let o = o.to_lowercase();
        lower.contains(&o) || o.contains(&lower)
    });
    match (contained.next(), contained.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

/// Picks the delivery city: the profile's preferred city, then its saved
/// address city, then the operator. With no site options the saved values
/// are used as they are.
///
/// # Errors
///
/// Propagates prompt failures.
pub async fn resolve_city<P: Prompter>(
    prompter: &P,
    profile: &Profile,
    options: &[String],
) -> Result<String, PromptError> {
    let address_city = profile
        .address
        .as_ref()
        .map(|a| a.city.as_str())
        .unwrap_or_default();

    if !options.is_empty() {
        if let Some(city) = match_city(&profile.preferred_city, options)
            .or_else(|| match_city(address_city, options))
        {
            return Ok(city);
        }
        return select_city(prompter, options).await;
    }
    if !profile.preferred_city.trim().is_empty() {
        return Ok(profile.preferred_city.trim().to_string());
    }
    if !address_city.trim().is_empty() {
        return Ok(address_city.trim().to_string());
    }
    select_city(prompter, options).await
}

/// Asks the operator. A menu index or a recognisable name picks an option;
/// anything else non-empty is taken verbatim.
///
/// # Errors
///
/// Propagates prompt failures.
pub async fn select_city<P: Prompter>(prompter: &P, options: &[String]) -> Result<String, PromptError> {
    if options.is_empty() {
        return prompter.ask("Enter delivery city").await;
    }
    prompter.notify("Select delivery city:");
    for (i, city) in options.iter().enumerate() {
        prompter.notify(&format!("  {}) {city}", i + 1));
    }
    let label = format!("Choose [1-{}] or type city name", options.len());
    loop {
        let answer = prompter.ask(&label).await?;
        if answer.is_empty() {
            continue;
        }
        if let Some(index) = parse_index(&answer, options.len()) {
            return Ok(options[index].clone());
        }
        return Ok(match_city(&answer, options).unwrap_or(answer));
    }
}

#[cfg(test)]
mod tests {
    use bisleri_core::{Address, ScriptedPrompter};

    use super::*;

    fn options() -> Vec<String> {
        ["Bengaluru", "Mumbai", "Gurugram", "New Delhi", "Delhi NCR"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn exact_match_ignores_case() {
        assert_eq!(match_city("mumbai", &options()).as_deref(), Some("Mumbai"));
    }

    #[test]
    fn aliases_resolve_old_names() {
        assert_eq!(match_city("Bangalore", &options()).as_deref(), Some("Bengaluru"));
        assert_eq!(match_city("gurgaon", &options()).as_deref(), Some("Gurugram"));
        assert_eq!(match_city("Bombay", &options()).as_deref(), Some("Mumbai"));
    }

    #[test]
    fn containment_needs_a_unique_hit() {
        assert_eq!(match_city("Mumbai Suburban", &options()).as_deref(), Some("Mumbai"));
        assert_eq!(match_city("Delhi", &options()), None);
        assert_eq!(match_city("Chennai", &options()), None);
        assert_eq!(match_city("  ", &options()), None);
    }

    #[tokio::test]
    async fn preferred_city_wins_over_address_city() {
        let mut profile = Profile::new("home");
        profile.preferred_city = "bombay".into();
        profile.address = Some(Address {
            city: "Bengaluru".into(),
            ..Address::default()
        });
        let prompter = ScriptedPrompter::new();
        let city = resolve_city(&prompter, &profile, &options()).await.unwrap();
        assert_eq!(city, "Mumbai");
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn address_city_used_when_preferred_does_not_match() {
        let mut profile = Profile::new("home");
        profile.preferred_city = "Chennai".into();
        profile.address = Some(Address {
            city: "bengaluru".into(),
            ..Address::default()
        });
        let city = resolve_city(&ScriptedPrompter::new(), &profile, &options())
            .await
            .unwrap();
        assert_eq!(city, "Bengaluru");
    }

    #[tokio::test]
    async fn operator_picks_by_index_or_name() {
        let profile = Profile::new("home");
        let prompter = ScriptedPrompter::new().with_answers(["", "2"]);
        assert_eq!(resolve_city(&prompter, &profile, &options()).await.unwrap(), "Mumbai");

        let prompter = ScriptedPrompter::new().with_answers(["gurgaon"]);
        assert_eq!(resolve_city(&prompter, &profile, &options()).await.unwrap(), "Gurugram");

        let prompter = ScriptedPrompter::new().with_answers(["Pune"]);
        assert_eq!(resolve_city(&prompter, &profile, &options()).await.unwrap(), "Pune");
    }

    #[tokio::test]
    async fn without_options_saved_values_are_used_verbatim() {
        let mut profile = Profile::new("home");
        profile.preferred_city = "Pune".into();
        assert_eq!(
            resolve_city(&ScriptedPrompter::new(), &profile, &[]).await.unwrap(),
            "Pune"
        );

        let prompter = ScriptedPrompter::new().with_answers(["Chennai"]);
        assert_eq!(
            resolve_city(&prompter, &Profile::new("x"), &[]).await.unwrap(),
            "Chennai"
        );
        assert_eq!(prompter.asked(), vec!["Enter delivery city"]);
    }
}
