use tracing::{error, info};

use crate::apis::CountryLookup;
use crate::common::capitalize;
use crate::common::error::Result;
use crate::common::types::CountryInput;

/// Resolves configured country names to ISO alpha-2 codes.
pub struct GeoResolver<'a> {
    lookup: &'a dyn CountryLookup,
}

impl<'a> GeoResolver<'a> {
    pub fn new(lookup: &'a dyn CountryLookup) -> Self {
        Self { lookup }
    }

    /// Resolve every configured country, in input order. A failed lookup
    /// degrades that entry only; sibling resolutions continue.
    pub async fn resolve(&self, countries: &CountryInput) -> Result<Vec<String>> {
        let names = countries.names();
        let mut codes = Vec::with_capacity(names.len());

        for name in &names {
            let country = capitalize(name);
            match self.lookup.country_code(&country).await {
                Ok(code) => {
                    info!(
                        status = "success",
                        message = format!("Country code for {country} is {code}").as_str(),
                        "country resolved"
                    );
                    codes.push(code);
                }
                Err(e) => {
                    error!(
                        status = "error",
                        message =
                            format!("Unable to get country code for {country} from the API")
                                .as_str(),
                        error = %e,
                        "country resolution failed"
                    );
                }
            }
        }

        info!(
            status = "success",
            message = format!("Country codes for {names:?} are {codes:?}").as_str(),
            "country batch resolved"
        );
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::PipelineError;

    struct FakeCountryLookup;

    #[async_trait::async_trait]
    impl CountryLookup for FakeCountryLookup {
        async fn country_code(&self, country: &str) -> Result<String> {
            match country {
                "Nigeria" => Ok("NG".to_string()),
                "Ghana" => Ok("GH".to_string()),
                other => Err(PipelineError::Api {
                    message: format!("Country service returned no results for {other}"),
                }),
            }
        }
    }

    #[tokio::test]
    async fn resolves_codes_in_input_order() {
        let resolver = GeoResolver::new(&FakeCountryLookup);
        let input = CountryInput::Many(vec!["nigeria".to_string(), "ghana".to_string()]);

        let codes = resolver.resolve(&input).await.unwrap();
        assert_eq!(codes, vec!["NG".to_string(), "GH".to_string()]);
        for code in &codes {
            assert_eq!(code.len(), 2);
            assert_eq!(code.to_uppercase(), *code);
        }
    }

    #[test]
    fn capitalizes_before_lookup() {
        // The fake only knows capitalized names; a lowercase query would fail.
        let resolver = GeoResolver::new(&FakeCountryLookup);
        let input = CountryInput::Single("NIGERIA".to_string());
        let codes = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(resolver.resolve(&input))
            .unwrap();
        assert_eq!(codes, vec!["NG".to_string()]);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let resolver = GeoResolver::new(&FakeCountryLookup);
        let input = CountryInput::Many(vec![
            "nigeria".to_string(),
            "atlantis".to_string(),
            "ghana".to_string(),
        ]);

        let codes = resolver.resolve(&input).await.unwrap();
        assert_eq!(codes, vec!["NG".to_string(), "GH".to_string()]);
    }
}
