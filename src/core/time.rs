use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn format_offset_outputs_utc_z() {
        let value = datetime!(2025-01-02 10:20:30 UTC);
        assert_eq!(format_offset(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn format_offset_preserves_offset() {
        let value = datetime!(2025-01-02 13:20:30 +03:00);
        assert_eq!(format_offset(value), "2025-01-02T13:20:30+03:00");
    }
}
