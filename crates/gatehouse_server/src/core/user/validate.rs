use crate::core::error::FieldErrors;
use crate::core::user::form::{UserForm, IMAGE_FIELD};
use gatehouse_utils::utils::parse_form_bool;
use image::ImageFormat;

const FLAG_FIELDS: [&str; 3] = ["is_active", "is_staff", "is_superuser"];

/// Checked form values that are not plain strings
#[derive(Debug, Default, PartialEq)]
pub struct ValidatedForm {
    pub image_format: Option<ImageFormat>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Detect the format of an uploaded image and make sure it actually decodes
pub fn validate_image(data: &[u8]) -> Option<ImageFormat> {
    let format = image::guess_format(data).ok()?;
    image::load_from_memory_with_format(data, format).ok()?;
    Some(format)
}

fn require(form: &UserForm, errors: &mut FieldErrors, field: &str, message: &str) {
    if form.get(field).is_none() {
        errors.insert(field.to_string(), message.to_string());
    }
}

fn check_common(form: &UserForm, errors: &mut FieldErrors) -> ValidatedForm {
    require(form, errors, "first_name", "First name is required.");
    require(form, errors, "last_name", "Last name is required.");

    let mut validated = ValidatedForm::default();

    if let Some(image) = &form.image {
        match validate_image(image) {
            Some(format) => validated.image_format = Some(format),
            None => {
                errors.insert(IMAGE_FIELD.to_string(), "Invalid image format.".to_string());
            }
        }
    }

    if let Some(email) = form.get("email") {
        if !is_valid_email(email) {
            errors.insert(
                "email".to_string(),
                "Enter a valid email address.".to_string(),
            );
        }
    }

    for field in FLAG_FIELDS {
        let Some(value) = form.get(field) else {
            continue;
        };
        match parse_form_bool(value) {
            Ok(flag) => match field {
                "is_active" => validated.is_active = Some(flag),
                "is_staff" => validated.is_staff = Some(flag),
                _ => validated.is_superuser = Some(flag),
            },
            Err(_) => {
                errors.insert(field.to_string(), "Must be a valid boolean.".to_string());
            }
        }
    }

    validated
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Fields required to create an account
pub fn validate_create_user_form(form: &UserForm) -> Result<ValidatedForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    require(form, &mut errors, "email", "Email is required.");
    if form.get_raw("password").is_none() {
        errors.insert("password".to_string(), "Password is required.".to_string());
    }
    require(form, &mut errors, "username", "Username is required.");

    let validated = check_common(form, &mut errors);

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Fields required to update an account. Everything else is optional.
pub fn validate_update_user_form(form: &UserForm) -> Result<ValidatedForm, FieldErrors> {
    let mut errors = FieldErrors::new();
    let validated = check_common(form, &mut errors);

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png() -> Bytes {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(2, 2)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        Bytes::from(buffer.into_inner())
    }

    fn full_form() -> UserForm {
        UserForm::with_fields(&[
            ("email", "ada@example.com"),
            ("password", "s3cret"),
            ("username", "ada"),
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
        ])
    }

    #[test]
    fn test_create_form_valid() {
        let validated = validate_create_user_form(&full_form()).unwrap();
        assert_eq!(validated, ValidatedForm::default());
    }

    #[test]
    fn test_create_form_names_exactly_the_missing_fields() {
        let mut form = full_form();
        form.fields.remove("email");
        form.fields.insert("last_name".to_string(), "".to_string());

        let errors = validate_create_user_form(&form).unwrap_err();
        let keys: Vec<&String> = errors.keys().collect();
        assert_eq!(keys, vec!["email", "last_name"]);
        assert_eq!(errors["email"], "Email is required.");
        assert_eq!(errors["last_name"], "Last name is required.");
    }

    #[test]
    fn test_create_form_all_missing() {
        let errors = validate_create_user_form(&UserForm::default()).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors["password"], "Password is required.");
        assert_eq!(errors["username"], "Username is required.");
        assert_eq!(errors["first_name"], "First name is required.");
    }

    #[test]
    fn test_image_validation() {
        let mut form = full_form();
        form.image = Some(png());
        let validated = validate_create_user_form(&form).unwrap();
        assert_eq!(validated.image_format, Some(ImageFormat::Png));

        form.image = Some(Bytes::from_static(b"definitely not an image"));
        let errors = validate_create_user_form(&form).unwrap_err();
        assert_eq!(errors["image"], "Invalid image format.");
    }

    #[test]
    fn test_truncated_image_is_rejected() {
        let data = png();
        assert!(validate_image(&data[..data.len() / 2]).is_none());
    }

    #[test]
    fn test_update_form() {
        let form = UserForm::with_fields(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("is_staff", "true"),
        ]);
        let validated = validate_update_user_form(&form).unwrap();
        assert_eq!(validated.is_staff, Some(true));
        assert_eq!(validated.is_superuser, None);

        let form = UserForm::with_fields(&[("first_name", "Ada"), ("is_active", "maybe")]);
        let errors = validate_update_user_form(&form).unwrap_err();
        assert_eq!(errors["last_name"], "Last name is required.");
        assert_eq!(errors["is_active"], "Must be a valid boolean.");
    }

    #[test]
    fn test_invalid_email() {
        let mut form = full_form();
        form.fields
            .insert("email".to_string(), "not-an-email".to_string());
        let errors = validate_create_user_form(&form).unwrap_err();
        assert_eq!(errors["email"], "Enter a valid email address.");
    }
}
