//! Localized prompt texts, looked up by `(MessageId, Locale)`.
//!
//! Control flow never branches on language; it asks the bundle for a message
//! id and gets text back. Russian is the fallback locale.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    Pl,
    En,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Ru, Locale::Pl, Locale::En];

    pub fn code(self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::Pl => "pl",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ru" | "русский" => Ok(Locale::Ru),
            "pl" | "polski" => Ok(Locale::Pl),
            "en" | "english" => Ok(Locale::En),
            other => Err(format!("unknown locale: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageId {
    AskVehicle,
    AskYear,
    AskVin,
    AskPhone,
    AskIssue,
    ChooseSlot,
    InvalidVehicleFormat,
    InvalidVehicleMake,
    InvalidVehicleModel,
    InvalidYear,
    InvalidVin,
    InvalidPhone,
    InvalidIssue,
    UnknownSlot,
    SlotTaken,
    NoSlots,
    TryLater,
    BookingFailed,
    /// Takes `{slot}`.
    Confirmed,
    ResetDone,
    AlreadyBooked,
}

/// Resource bundle of message templates.
#[derive(Debug, Clone)]
pub struct MessageBundle {
    texts: HashMap<(MessageId, Locale), String>,
}

impl Default for MessageBundle {
    fn default() -> Self {
        let texts = BUILTIN
            .iter()
            .flat_map(|(id, ru, pl, en)| {
                [
                    ((*id, Locale::Ru), ru.to_string()),
                    ((*id, Locale::Pl), pl.to_string()),
                    ((*id, Locale::En), en.to_string()),
                ]
            })
            .collect();
        Self { texts }
    }
}

impl MessageBundle {
    /// Text for `id` in `locale`, falling back to Russian.
    pub fn text(&self, id: MessageId, locale: Locale) -> &str {
        self.texts
            .get(&(id, locale))
            .or_else(|| self.texts.get(&(id, Locale::Ru)))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Text with every `{name}` placeholder replaced from `args`.
    pub fn render(&self, id: MessageId, locale: Locale, args: &[(&str, &str)]) -> String {
        let mut out = self.text(id, locale).to_string();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }

    /// Replace or add templates.
    pub fn set(&mut self, id: MessageId, locale: Locale, text: impl Into<String>) {
        self.texts.insert((id, locale), text.into());
    }

    /// Merge overrides of the form `{"ask_vehicle": {"en": "..."}}`.
    pub fn merge_json(&mut self, json: &str) -> serde_json::Result<()> {
        let overrides: HashMap<MessageId, HashMap<Locale, String>> = serde_json::from_str(json)?;
        for (id, by_locale) in overrides {
            for (locale, text) in by_locale {
                self.set(id, locale, text);
            }
        }
        Ok(())
    }
}

const BUILTIN: &[(MessageId, &str, &str, &str)] = &[
    (
        MessageId::AskVehicle,
        "Введите марку и модель автомобиля, например: Audi A4",
        "Podaj markę i model samochodu, np. Audi A4",
        "Enter the vehicle make and model, e.g. Audi A4",
    ),
    (
        MessageId::AskYear,
        "Год выпуска:",
        "Podaj rok produkcji:",
        "Enter the year of manufacture:",
    ),
    (MessageId::AskVin, "VIN код:", "Kod VIN:", "VIN code:"),
    (
        MessageId::AskPhone,
        "Введите номер телефона:",
        "Podaj numer telefonu:",
        "Enter your phone number:",
    ),
    (
        MessageId::AskIssue,
        "Опишите проблему:",
        "Opisz problem:",
        "Describe the issue:",
    ),
    (
        MessageId::ChooseSlot,
        "Выберите удобное время:",
        "Wybierz dogodny termin:",
        "Choose a convenient time:",
    ),
    (
        MessageId::InvalidVehicleFormat,
        "❌ Введите марку и модель через пробел, например: Audi A4",
        "❌ Wprowadź markę i model oddzielone spacją, np. Audi A4",
        "❌ Enter make and model separated by space, e.g. Audi A4",
    ),
    (
        MessageId::InvalidVehicleMake,
        "❌ Марка должна содержать только буквы.",
        "❌ Marka może zawierać tylko litery.",
        "❌ Make must contain only letters.",
    ),
    (
        MessageId::InvalidVehicleModel,
        "❌ Модель должна содержать только буквы и цифры.",
        "❌ Model może zawierać tylko litery i cyfry.",
        "❌ Model can only contain letters and digits.",
    ),
    (
        MessageId::InvalidYear,
        "❌ Введите корректный год (4 цифры, не раньше 1990).",
        "❌ Wprowadź poprawny rok (4 cyfry, nie wcześniej niż 1990).",
        "❌ Enter a valid year (4 digits, not earlier than 1990).",
    ),
    (
        MessageId::InvalidVin,
        "❌ VIN должен содержать ровно 17 символов (без I, O, Q).",
        "❌ VIN musi mieć dokładnie 17 znaków (bez I, O, Q).",
        "❌ VIN must be exactly 17 characters (excluding I, O, Q).",
    ),
    (
        MessageId::InvalidPhone,
        "❌ Введите корректный номер телефона (9–15 цифр).",
        "❌ Wprowadź poprawny numer telefonu (9–15 cyfr).",
        "❌ Enter a valid phone number (9–15 digits).",
    ),
    (
        MessageId::InvalidIssue,
        "❌ Опишите проблему хотя бы одним словом.",
        "❌ Opisz problem przynajmniej jednym słowem.",
        "❌ Describe the issue in at least one word.",
    ),
    (
        MessageId::UnknownSlot,
        "❌ Выберите время из списка.",
        "❌ Wybierz termin z listy.",
        "❌ Please pick a time from the list.",
    ),
    (
        MessageId::SlotTaken,
        "⚠️ Это время уже занято. Пожалуйста, выберите другое.",
        "⚠️ Ten termin jest już zajęty. Wybierz inny.",
        "⚠️ This time slot is already booked. Please choose another.",
    ),
    (
        MessageId::NoSlots,
        "Нет доступных времён. Попробуйте позже.",
        "Brak wolnych terminów. Spróbuj później.",
        "No free time slots. Please try again later.",
    ),
    (
        MessageId::TryLater,
        "⚠️ Календарь временно недоступен. Попробуйте позже.",
        "⚠️ Kalendarz jest chwilowo niedostępny. Spróbuj ponownie później.",
        "⚠️ The calendar is temporarily unavailable. Please try again later.",
    ),
    (
        MessageId::BookingFailed,
        "⚠️ Не удалось записать вас на это время. Попробуйте ещё раз.",
        "⚠️ Nie udało się zarezerwować terminu. Spróbuj ponownie.",
        "⚠️ Could not book this time. Please try again.",
    ),
    (
        MessageId::Confirmed,
        "✅ Ваша запись подтверждена на {slot}. Спасибо!",
        "✅ Twoja rezerwacja została potwierdzona na {slot}. Dziękujemy!",
        "✅ Your appointment is confirmed for {slot}. Thank you!",
    ),
    (
        MessageId::ResetDone,
        "🔁 Данные сброшены. Начнём заново.",
        "🔁 Dane wyczyszczone. Zaczynamy od nowa.",
        "🔁 Cleared. Let's start over.",
    ),
    (
        MessageId::AlreadyBooked,
        "Ваша запись уже оформлена. Напишите «сброс», чтобы записаться снова.",
        "Rezerwacja jest już zapisana. Napisz „reset”, aby zarezerwować ponownie.",
        "Your appointment is already booked. Send \"reset\" to book another.",
    ),
];
