mod common;

use foodrisk_core::{
    config::EngineConfig,
    country::{CountryResolver, SpecialAreas},
    records::RiskRecord,
};

fn special() -> SpecialAreas {
    SpecialAreas::new(&EngineConfig::default().special_areas)
}

#[test]
fn query_is_trimmed_and_case_folded() {
    let special = special();
    let resolver = CountryResolver::new(&special);
    let hits = resolver.resolve("  MALTA ", &common::risk_rows());
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|r: &RiskRecord| r.country == "Malta"));
}

#[test]
fn empty_query_matches_nothing() {
    let special = special();
    let resolver = CountryResolver::new(&special);
    assert!(resolver.resolve("", &common::risk_rows()).is_empty());
    assert!(resolver.resolve("   ", &common::base_rows()).is_empty());
}

#[test]
fn unknown_country_is_empty_not_an_error() {
    let special = special();
    let hits = CountryResolver::new(&special).resolve("Atlantis", &common::base_rows());
    assert!(hits.is_empty());
}

#[test]
fn exact_match_shadows_substring_matches() {
    let special = special();
    let resolver = CountryResolver::new(&special);
    let exact = resolver.resolve("niger", &common::base_rows());
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].country, "Niger");

    let partial = resolver.resolve("iger", &common::base_rows());
    let mut countries: Vec<&str> = partial.iter().map(|r| r.country.as_str()).collect();
    countries.sort_unstable();
    assert_eq!(countries, vec!["Niger", "Nigeria"]);
}

#[test]
fn special_areas_are_invisible_to_both_tiers() {
    let special = special();
    let resolver = CountryResolver::new(&special);
    assert!(resolver.resolve("China, mainland", &common::base_rows()).is_empty());
    assert!(resolver.resolve("china", &common::base_rows()).is_empty());
    assert!(special.is_special("Netherlands (Kingdom of the)"));
    assert_eq!(special.retain(&common::risk_rows()).len(), common::risk_rows().len() - 1);
}
