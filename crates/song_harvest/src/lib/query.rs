use song_store::Track;

const SEPARATOR: &str = "+";

/// Builds the URL-safe search string for a track: artist then title, each
/// percent-encoded on its own, absent or blank fields left out.
pub fn build_query(track: &Track) -> String {
    [track.artist.as_deref(), track.track.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| urlencoding::encode(field).into_owned())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: Option<&str>, title: Option<&str>) -> Track {
        Track {
            artist: artist.map(Into::into),
            track: title.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_joins_artist_and_track() {
        let query = build_query(&track(Some("Bill Withers"), Some("Lovely Day")));
        assert_eq!(query, "Bill%20Withers+Lovely%20Day");
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let query = build_query(&track(Some("AC/DC"), Some("Rock & Roll")));
        assert_eq!(query, "AC%2FDC+Rock%20%26%20Roll");
        assert!(!query.contains('&'));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        assert_eq!(build_query(&track(None, Some("Heroes"))), "Heroes");
        assert_eq!(build_query(&track(Some("Bowie"), None)), "Bowie");
        assert_eq!(build_query(&track(Some("  "), Some("Heroes"))), "Heroes");
    }

    #[test]
    fn test_empty_when_both_absent() {
        assert_eq!(build_query(&track(None, None)), "");
    }

    #[test]
    fn test_encoded_separator_in_field_is_not_a_separator() {
        let query = build_query(&track(Some("A+B"), Some("C")));
        assert_eq!(query, "A%2BB+C");
    }
}
