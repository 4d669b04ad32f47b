//! Tests for version token parsing and ordering

use std::cmp::Ordering;

use migcheck::version::{compare, VersionToken};

#[test]
fn test_numeric_ordering() {
    assert_eq!(compare("0.43.0", "0.52.0").unwrap(), Ordering::Less);
    assert_eq!(compare("0.55.2", "0.55.2").unwrap(), Ordering::Equal);
    assert_eq!(compare("1.0.0", "0.99.99").unwrap(), Ordering::Greater);
    assert_eq!(compare("0.52.0", "0.52.1").unwrap(), Ordering::Less);
    assert_eq!(compare("2.0.0", "10.0.0").unwrap(), Ordering::Less);
}

#[test]
fn test_comparison_is_antisymmetric() {
    let tokens = [
        "0.40.3", "0.43.0", "0.55.2", "1.0.0", "1.2.3-rc1", "1.2.3", "current",
    ];
    for a in &tokens {
        for b in &tokens {
            let forward = compare(a, b).unwrap();
            let backward = compare(b, a).unwrap();
            assert_eq!(forward, backward.reverse(), "{} vs {}", a, b);
        }
    }
}

#[test]
fn test_comparison_is_reflexive() {
    for token in ["0.0.1", "0.55.2", "1.2.3-alpha", "current"] {
        assert_eq!(compare(token, token).unwrap(), Ordering::Equal);
    }
}

#[test]
fn test_current_outranks_every_release() {
    for release in ["0.0.1", "0.56.4", "99.99.99", "1.2.3-rc1"] {
        assert_eq!(compare("current", release).unwrap(), Ordering::Greater);
        assert_eq!(compare(release, "current").unwrap(), Ordering::Less);
    }
    assert_eq!(compare("current", "current").unwrap(), Ordering::Equal);
}

#[test]
fn test_release_outranks_its_own_pre_release() {
    assert_eq!(compare("1.2.3", "1.2.3-rc1").unwrap(), Ordering::Greater);
    assert_eq!(compare("1.2.3-rc1", "1.2.3").unwrap(), Ordering::Less);
}

#[test]
fn test_pre_releases_compare_as_opaque_strings() {
    // Deliberately lexical, so rc10 sorts before rc2.
    assert_eq!(compare("1.0.0-rc10", "1.0.0-rc2").unwrap(), Ordering::Less);
    assert_eq!(compare("1.0.0-alpha", "1.0.0-beta").unwrap(), Ordering::Less);
}

#[test]
fn test_build_metadata_is_ignored() {
    assert_eq!(compare("1.2.3+build5", "1.2.3").unwrap(), Ordering::Equal);
    assert_eq!(compare("1.2.3+a", "1.2.3+b").unwrap(), Ordering::Equal);
    assert_eq!(
        VersionToken::parse("1.2.3+a").unwrap(),
        VersionToken::parse("1.2.3+b").unwrap()
    );
}

#[test]
fn test_malformed_input_is_a_parse_error() {
    for bad in ["abc", "1.0", "1", "", "1.0.0.0", "v1.0.0", "1.0.0-", "1..0"] {
        assert!(
            compare(bad, "1.0.0").is_err(),
            "`{}` should not parse",
            bad
        );
        assert!(
            compare("1.0.0", bad).is_err(),
            "`{}` should not parse as second operand",
            bad
        );
    }
}

#[test]
fn test_parse_error_names_the_token() {
    let err = VersionToken::parse("not-a-version").unwrap_err();
    assert!(err.to_string().contains("not-a-version"));
}

#[test]
fn test_sentinel_is_case_insensitive() {
    assert_eq!(VersionToken::parse("CURRENT").unwrap(), VersionToken::Current);
    assert_eq!(VersionToken::parse("Current").unwrap(), VersionToken::Current);
}

#[test]
fn test_display_round_trips() {
    for token in ["0.55.2", "1.2.3-rc1", "1.2.3-rc1+build7", "current"] {
        let parsed = VersionToken::parse(token).unwrap();
        assert_eq!(parsed.to_string(), token);
    }
}
