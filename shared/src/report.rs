use crate::error::FormError;
use crate::geo::Coordinate;

pub const MAX_PHOTO_BYTES: u64 = 5 * 1024 * 1024;
const ALLOWED_PHOTO_TYPES: &[&str] = &["image/jpeg", "image/png"];
const ALLOWED_PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// What the form knows about a selected photo before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMeta {
    pub name: String,
    pub mime: String,
    pub size: u64,
}

impl PhotoMeta {
    pub fn validate(&self) -> Result<(), FormError> {
        let mime_ok = ALLOWED_PHOTO_TYPES.contains(&self.mime.to_ascii_lowercase().as_str());
        // Some platforms report an empty type; fall back to the extension.
        let extension_ok = self.mime.is_empty()
            && self
                .name
                .rsplit_once('.')
                .is_some_and(|(_, ext)| {
                    ALLOWED_PHOTO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                });
        if !mime_ok && !extension_ok {
            return Err(FormError::UnsupportedPhoto);
        }
        if self.size > MAX_PHOTO_BYTES {
            return Err(FormError::PhotoTooLarge);
        }
        Ok(())
    }
}

/// The report form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemDraft {
    pub description: String,
    pub category_id: Option<i64>,
    pub address: String,
    pub coordinate: Option<Coordinate>,
    pub photo: Option<PhotoMeta>,
}

/// A draft that passed validation and can be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub description: String,
    pub category_id: i64,
    pub address: Option<String>,
    pub coordinate: Coordinate,
    pub photo: Option<PhotoMeta>,
}

impl ProblemDraft {
    pub fn validate(&self) -> Result<ValidDraft, FormError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FormError::MissingDescription);
        }
        let category_id = self.category_id.ok_or(FormError::MissingCategory)?;
        let coordinate = self
            .coordinate
            .filter(Coordinate::is_valid)
            .ok_or(FormError::MissingLocation)?;
        if let Some(photo) = &self.photo {
            photo.validate()?;
        }
        let address = self.address.trim();
        Ok(ValidDraft {
            description: description.to_string(),
            category_id,
            address: (!address.is_empty()).then(|| address.to_string()),
            coordinate,
            photo: self.photo.clone(),
        })
    }
}

impl ValidDraft {
    /// Text parts of the multipart submission; the photo part is added separately.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("latitude", self.coordinate.latitude.to_string()),
            ("longitude", self.coordinate.longitude.to_string()),
            ("description", self.description.clone()),
            ("category_id", self.category_id.to_string()),
        ];
        if let Some(address) = &self.address {
            fields.push(("address", address.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProblemDraft {
        ProblemDraft {
            description: "  Lixo acumulado  ".into(),
            category_id: Some(1),
            address: " ".into(),
            coordinate: Some(Coordinate::new(-29.1683, -51.1894)),
            photo: None,
        }
    }

    fn photo(name: &str, mime: &str, size: u64) -> PhotoMeta {
        PhotoMeta {
            name: name.into(),
            mime: mime.into(),
            size,
        }
    }

    #[test]
    fn valid_draft_is_trimmed() {
        let valid = draft().validate().unwrap();
        assert_eq!(valid.description, "Lixo acumulado");
        assert_eq!(valid.address, None);
        assert_eq!(
            valid.text_fields(),
            vec![
                ("latitude", "-29.1683".to_string()),
                ("longitude", "-51.1894".to_string()),
                ("description", "Lixo acumulado".to_string()),
                ("category_id", "1".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_missing_required_fields() {
        let mut d = draft();
        d.description = "   ".into();
        assert_eq!(d.validate(), Err(FormError::MissingDescription));

        let mut d = draft();
        d.category_id = None;
        assert_eq!(d.validate(), Err(FormError::MissingCategory));

        let mut d = draft();
        d.coordinate = None;
        assert_eq!(d.validate(), Err(FormError::MissingLocation));
    }

    #[test]
    fn photo_type_and_size_are_checked() {
        let mut d = draft();
        d.photo = Some(photo("buraco.gif", "image/gif", 10));
        assert_eq!(d.validate(), Err(FormError::UnsupportedPhoto));

        d.photo = Some(photo("buraco.jpg", "image/jpeg", MAX_PHOTO_BYTES + 1));
        assert_eq!(d.validate(), Err(FormError::PhotoTooLarge));

        d.photo = Some(photo("buraco.PNG", "", 1024));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn address_is_sent_when_present() {
        let mut d = draft();
        d.address = "Av. Júlio de Castilhos, 1500".into();
        let fields = d.validate().unwrap().text_fields();
        assert_eq!(
            fields.last(),
            Some(&("address", "Av. Júlio de Castilhos, 1500".to_string()))
        );
    }
}
