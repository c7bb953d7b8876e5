//! Minimal XML field extraction for bucket API responses.
//!
//! The object API's response surface is small and flat enough that pulling
//! out individual element values beats carrying a full XML parser.

/// Extract the text content of the first `<element>` in `xml`
pub(crate) fn extract_value(xml: &str, element: &str) -> Option<String> {
    let start_tag = format!("<{}>", element);
    let end_tag = format!("</{}>", element);

    let start = xml.find(&start_tag)? + start_tag.len();
    let end = xml[start..].find(&end_tag)? + start;

    Some(xml[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_value() {
        let xml = "<Error><Code>NoSuchKey</Code><Message>gone</Message></Error>";
        assert_eq!(extract_value(xml, "Code").as_deref(), Some("NoSuchKey"));
        assert_eq!(extract_value(xml, "Message").as_deref(), Some("gone"));
        assert_eq!(extract_value(xml, "RequestId"), None);
    }

    #[test]
    fn test_extract_empty_element() {
        assert_eq!(extract_value("<Prefix></Prefix>", "Prefix").as_deref(), Some(""));
    }
}
