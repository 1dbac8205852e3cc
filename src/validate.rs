const MIN_LENGTH: usize = 3;

pub const NAME_REQUIRED: &str = "Введите имя";
pub const NAME_TOO_SHORT: &str = "Имя должно быть не короче 3 символов";
pub const TEXT_REQUIRED: &str = "Введите комментарий";
pub const TEXT_TOO_SHORT: &str = "Комментарий должен быть не короче 3 символов";

/// Returns the message of the first rule the draft breaks. The name is only
/// checked for anonymous posts, and always before the text.
pub fn validate(is_authorized: bool, name: &str, text: &str) -> Option<&'static str> {
    if !is_authorized {
        let name = name.trim();
        if name.is_empty() {
            return Some(NAME_REQUIRED);
        }
        if name.chars().count() < MIN_LENGTH {
            return Some(NAME_TOO_SHORT);
        }
    }

    let text = text.trim();
    if text.is_empty() {
        return Some(TEXT_REQUIRED);
    }
    if text.chars().count() < MIN_LENGTH {
        return Some(TEXT_TOO_SHORT);
    }

    None
}
