//! Localized strings for calendar messages.
//!
//! Known languages are en, fr, es, de and it. Anything else falls back to
//! English.

use chrono::{Datelike, NaiveDate};

use crate::datetime::{weekday_name, ISO_DATE_FORMAT};
use crate::hooks::{Interval, WeekdayTranslations};

/// Title of a mention preview field, e.g. "Experience in 3 days!".
pub fn preview_title(language: &str, bonus: &str, days_ahead: u32) -> String {
    match (language, days_ahead) {
        ("fr", 1) => format!("{bonus} demain !"),
        ("fr", n) => format!("{bonus} dans {n} jours !"),
        ("es", 1) => format!("{bonus} mañana!"),
        ("es", n) => format!("{bonus} en {n} días!"),
        ("de", 1) => format!("{bonus} morgen!"),
        ("de", n) => format!("{bonus} in {n} Tagen!"),
        ("it", 1) => format!("{bonus} domani!"),
        ("it", n) => format!("{bonus} in {n} giorni!"),
        (_, 1) => format!("{bonus} tomorrow!"),
        (_, n) => format!("{bonus} in {n} days!"),
    }
}

/// Title of a message that only carries mention previews.
pub fn hint_title(language: &str) -> &'static str {
    match language {
        "fr" => "Remarque",
        "es" => "Pista",
        "de" => "Hinweis",
        "it" => "Suggerimento",
        _ => "Hint",
    }
}

/// Message content of a weekly or monthly summary.
pub fn summary_content(language: &str, interval: Interval) -> Option<&'static str> {
    let text = match (interval, language) {
        (Interval::Daily, _) => return None,
        (Interval::Weekly, "fr") => "Voici les bonus de la semaine !",
        (Interval::Weekly, "es") => "¡Aquí están los bonos de la semana!",
        (Interval::Weekly, "de") => "Hier sind die Boni der Woche!",
        (Interval::Weekly, "it") => "Ecco i bonus della settimana!",
        (Interval::Weekly, _) => "Here are the bonuses for the week!",
        (Interval::Monthly, "fr") => "Voici les bonus du mois !",
        (Interval::Monthly, "es") => "¡Aquí están los bonos del mes!",
        (Interval::Monthly, "de") => "Hier sind die Boni des Monats!",
        (Interval::Monthly, "it") => "Ecco i bonus del mese!",
        (Interval::Monthly, _) => "Here are the bonuses for the month!",
    };
    Some(text)
}

/// Name of the tribute total field.
pub fn total_title(language: &str) -> &'static str {
    match language {
        "de" => "Gesamt",
        "it" => "Totale",
        _ => "Total",
    }
}

/// Localized date, e.g. "Samstag, 02.01.2021".
///
/// Returns `None` for languages without a date format.
pub fn format_date(
    language: &str,
    date: NaiveDate,
    translations: &WeekdayTranslations,
) -> Option<String> {
    let pattern = match language {
        "de" => "%d.%m.%Y",
        "en" | "fr" | "es" | "it" => "%d/%m/%Y",
        _ => return None,
    };

    let english = weekday_name(date.weekday());
    let weekday = translations.get(language, english).unwrap_or(english);
    Some(format!("{}, {}", weekday, date.format(pattern)))
}

/// Date label honoring the subscriber's ISO preference.
pub fn date_label(
    language: &str,
    date: NaiveDate,
    iso: bool,
    translations: &WeekdayTranslations,
) -> String {
    if iso {
        return date.format(ISO_DATE_FORMAT).to_string();
    }
    format_date(language, date, translations)
        .unwrap_or_else(|| date.format(ISO_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translations() -> WeekdayTranslations {
        let mut t = WeekdayTranslations::new();
        t.insert("de", "Saturday", "Samstag");
        t.insert("fr", "Saturday", "Samedi");
        t
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, 2).unwrap()
    }

    #[test]
    fn test_preview_title() {
        assert_eq!(preview_title("en", "Experience", 1), "Experience tomorrow!");
        assert_eq!(preview_title("en", "Experience", 3), "Experience in 3 days!");
        assert_eq!(preview_title("fr", "Sagesse", 1), "Sagesse demain !");
        assert_eq!(preview_title("de", "Weisheit", 4), "Weisheit in 4 Tagen!");
        assert_eq!(preview_title("xx", "Bonus", 2), "Bonus in 2 days!");
    }

    #[test]
    fn test_hint_and_total() {
        assert_eq!(hint_title("it"), "Suggerimento");
        assert_eq!(hint_title("pt"), "Hint");
        assert_eq!(total_title("de"), "Gesamt");
        assert_eq!(total_title("fr"), "Total");
    }

    #[test]
    fn test_summary_content() {
        assert_eq!(summary_content("en", Interval::Daily), None);
        assert_eq!(
            summary_content("es", Interval::Monthly),
            Some("¡Aquí están los bonos del mes!")
        );
        assert_eq!(
            summary_content("en", Interval::Weekly),
            Some("Here are the bonuses for the week!")
        );
    }

    #[test]
    fn test_format_date() {
        let t = translations();
        assert_eq!(
            format_date("de", date(), &t).as_deref(),
            Some("Samstag, 02.01.2021")
        );
        assert_eq!(
            format_date("fr", date(), &t).as_deref(),
            Some("Samedi, 02/01/2021")
        );
        assert_eq!(
            format_date("en", date(), &t).as_deref(),
            Some("Saturday, 02/01/2021")
        );
        assert_eq!(format_date("pt", date(), &t), None);
    }

    #[test]
    fn test_date_label() {
        let t = translations();
        assert_eq!(date_label("de", date(), true, &t), "2021-01-02");
        assert_eq!(date_label("de", date(), false, &t), "Samstag, 02.01.2021");
        assert_eq!(date_label("pt", date(), false, &t), "2021-01-02");
    }
}
