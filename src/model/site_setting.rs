use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::storage::ImageCategory;

/// Public site content. Stored as key/value rows, always handled through
/// this struct so no caller deals with string keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SiteContent {
    #[schema(example = "Tirta Swim School")]
    pub site_name: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_image: Option<String>,
    pub about_text: String,
    pub history_title: String,
    pub history_text: String,
    pub history_image: Option<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub contact_whatsapp: String,
    pub address: String,
    pub instagram_url: String,
    pub opening_hours: String,
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            site_name: "Swim School".into(),
            hero_title: "Learn to swim with confidence".into(),
            hero_subtitle: "Certified coaches for kids and adults".into(),
            hero_image: None,
            about_text: String::new(),
            history_title: "Our history".into(),
            history_text: String::new(),
            history_image: None,
            contact_phone: String::new(),
            contact_email: String::new(),
            contact_whatsapp: String::new(),
            address: String::new(),
            instagram_url: String::new(),
            opening_hours: "Mon-Sun 06:00-18:00".into(),
        }
    }
}

/// Every key read in one batch when the content is loaded.
pub const SITE_CONTENT_KEYS: [&str; 14] = [
    "site_name",
    "hero_title",
    "hero_subtitle",
    "hero_image",
    "about_text",
    "history_title",
    "history_text",
    "history_image",
    "contact_phone",
    "contact_email",
    "contact_whatsapp",
    "address",
    "instagram_url",
    "opening_hours",
];

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

impl SiteContent {
    /// Unknown keys are ignored, missing keys keep their default.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut content = Self::default();
        for (key, value) in rows {
            content.set(&key, value);
        }
        content
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "site_name" => self.site_name = value,
            "hero_title" => self.hero_title = value,
            "hero_subtitle" => self.hero_subtitle = value,
            "hero_image" => self.hero_image = non_empty(value),
            "about_text" => self.about_text = value,
            "history_title" => self.history_title = value,
            "history_text" => self.history_text = value,
            "history_image" => self.history_image = non_empty(value),
            "contact_phone" => self.contact_phone = value,
            "contact_email" => self.contact_email = value,
            "contact_whatsapp" => self.contact_whatsapp = value,
            "address" => self.address = value,
            "instagram_url" => self.instagram_url = value,
            "opening_hours" => self.opening_hours = value,
            _ => {}
        }
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::Hero => self.hero_image.as_deref(),
            ImageSlot::History => self.history_image.as_deref(),
        }
    }
}

/// Text fields an editor may change; images go through [`ImageSlot`].
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SiteContentPatch {
    pub site_name: Option<String>,
    pub hero_title: Option<String>,
    pub hero_subtitle: Option<String>,
    pub about_text: Option<String>,
    pub history_title: Option<String>,
    pub history_text: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub contact_whatsapp: Option<String>,
    pub address: Option<String>,
    pub instagram_url: Option<String>,
    pub opening_hours: Option<String>,
}

impl SiteContentPatch {
    /// Key/value rows to upsert, only for the fields that were sent.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let fields: [(&'static str, &Option<String>); 12] = [
            ("site_name", &self.site_name),
            ("hero_title", &self.hero_title),
            ("hero_subtitle", &self.hero_subtitle),
            ("about_text", &self.about_text),
            ("history_title", &self.history_title),
            ("history_text", &self.history_text),
            ("contact_phone", &self.contact_phone),
            ("contact_email", &self.contact_email),
            ("contact_whatsapp", &self.contact_whatsapp),
            ("address", &self.address),
            ("instagram_url", &self.instagram_url),
            ("opening_hours", &self.opening_hours),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v.trim().to_string())))
            .collect()
    }
}

/// Single-image slots on the public site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, AsRefStr, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageSlot {
    Hero,
    History,
}

impl ImageSlot {
    pub fn key(self) -> &'static str {
        match self {
            ImageSlot::Hero => "hero_image",
            ImageSlot::History => "history_image",
        }
    }

    pub fn category(self) -> ImageCategory {
        match self {
            ImageSlot::Hero => ImageCategory::Hero,
            ImageSlot::History => ImageCategory::History,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let content = SiteContent::from_rows(vec![
            ("hero_title".to_string(), "Swim all year".to_string()),
            ("unknown_key".to_string(), "ignored".to_string()),
            ("hero_image".to_string(), "".to_string()),
        ]);
        assert_eq!(content.hero_title, "Swim all year");
        assert_eq!(content.hero_image, None);
        assert_eq!(content.site_name, SiteContent::default().site_name);
    }

    #[test]
    fn image_slots_read_their_own_field() {
        let content = SiteContent::from_rows(vec![(
            "history_image".to_string(),
            "sejarah/a.jpg".to_string(),
        )]);
        assert_eq!(content.image(ImageSlot::History), Some("sejarah/a.jpg"));
        assert_eq!(content.image(ImageSlot::Hero), None);
    }

    #[test]
    fn patch_rows_only_include_sent_fields() {
        let patch = SiteContentPatch {
            hero_title: Some("  New title ".into()),
            address: Some("Jl. Merdeka 1".into()),
            ..Default::default()
        };
        assert_eq!(
            patch.rows(),
            vec![
                ("hero_title", "New title".to_string()),
                ("address", "Jl. Merdeka 1".to_string()),
            ]
        );
    }

    #[test]
    fn every_patch_key_is_a_known_key() {
        let patch = SiteContentPatch {
            site_name: Some("a".into()),
            hero_title: Some("a".into()),
            hero_subtitle: Some("a".into()),
            about_text: Some("a".into()),
            history_title: Some("a".into()),
            history_text: Some("a".into()),
            contact_phone: Some("a".into()),
            contact_email: Some("a".into()),
            contact_whatsapp: Some("a".into()),
            address: Some("a".into()),
            instagram_url: Some("a".into()),
            opening_hours: Some("a".into()),
        };
        for (key, _) in patch.rows() {
            assert!(SITE_CONTENT_KEYS.contains(&key), "{key}");
        }
        assert!(SITE_CONTENT_KEYS.contains(&ImageSlot::Hero.key()));
        assert!(SITE_CONTENT_KEYS.contains(&ImageSlot::History.key()));
    }
}
