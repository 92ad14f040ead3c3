//! Ordered keyword rules for text-based disambiguation.
//!
//! Rules are evaluated in list order and the first rule with a keyword in
//! any nearby text wins, so more specific systems (storm before sanitary
//! before water) come first.

use takeoff_core::category::Category;
use takeoff_parser::label::contains_word;

use crate::config::KeywordRuleConfig;

/// A set of keywords that identify one category.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    category: Category,
    keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_ascii_uppercase()).collect(),
        }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Returns true if any keyword occurs as a word in `text`.
    pub fn matches(&self, text: &str) -> bool {
        let upper = text.to_ascii_uppercase();
        self.keywords.iter().any(|keyword| contains_word(&upper, keyword))
    }
}

impl From<&KeywordRuleConfig> for KeywordRule {
    fn from(config: &KeywordRuleConfig) -> Self {
        let keywords: Vec<&str> = config.keywords.iter().map(String::as_str).collect();
        KeywordRule::new(Category::from(config.category.clone()), &keywords)
    }
}

/// Built-in utility rules in priority order.
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            Category::Storm,
            &["STORM", "RCP", "CB", "CATCH BASIN", "SD", "STM", "CULVERT", "INLET"],
        ),
        KeywordRule::new(
            Category::Sewer,
            &["SEWER", "SANITARY", "SS", "SAN", "MH", "SSMH", "FORCE MAIN", "FM"],
        ),
        KeywordRule::new(
            Category::Water,
            &["WATER", "WM", "DIP", "PVC", "HYD", "HYDRANT", "GV"],
        ),
        KeywordRule::new(Category::Gas, &["GAS", "GM", "GAS MAIN"]),
        KeywordRule::new(
            Category::Electric,
            &["ELECTRIC", "ELEC", "UGE", "PRIMARY", "POWER"],
        ),
        KeywordRule::new(
            Category::Telecom,
            &["TELECOM", "TEL", "FIBER", "FO", "COMM", "CATV", "UGT"],
        ),
    ]
}

/// Rules for reading legend labels: curb and area categories first, then
/// the utility rules.
pub fn legend_keyword_rules(utility: &[KeywordRule]) -> Vec<KeywordRule> {
    let mut rules = vec![
        KeywordRule::new(Category::Curb, &["CURB", "C&G", "GUTTER"]),
        KeywordRule::new(Category::Sidewalk, &["SIDEWALK", "WALK"]),
        KeywordRule::new(Category::Building, &["BUILDING", "BLDG", "STRUCTURE"]),
        KeywordRule::new(Category::Pavement, &["PAVEMENT", "PAVING", "ASPHALT"]),
    ];
    rules.extend(utility.iter().cloned());
    rules
}

/// Returns the category of the first rule matching any of `texts`.
pub fn first_match<'a, I>(rules: &'a [KeywordRule], texts: I) -> Option<&'a Category>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let texts = texts.into_iter();
    rules
        .iter()
        .find(|rule| texts.clone().any(|text| rule.matches(text)))
        .map(KeywordRule::category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_decides() {
        let rules = default_keyword_rules();
        assert_eq!(
            first_match(&rules, ["8\" PVC SANITARY SEWER"]),
            Some(&Category::Sewer)
        );
        assert_eq!(first_match(&rules, ["18\" RCP"]), Some(&Category::Storm));
        assert_eq!(first_match(&rules, ["MH-4", "12\" DIP"]), Some(&Category::Sewer));
        assert_eq!(first_match(&rules, ["8\" PVC"]), Some(&Category::Water));
        assert_eq!(first_match(&rules, ["PROPERTY LINE"]), None);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        let rule = KeywordRule::new(Category::Storm, &["CB"]);
        assert!(rule.matches("cb-3"));
        assert!(!rule.matches("CBX"));
    }

    #[test]
    fn test_from_config() {
        let rule = KeywordRule::from(&KeywordRuleConfig {
            category: "irrigation".to_string(),
            keywords: vec!["irr".to_string()],
        });
        assert_eq!(rule.category(), &Category::Other("irrigation".to_string()));
        assert!(rule.matches("IRR LINE"));
    }

    #[test]
    fn test_legend_rules_include_areas() {
        let rules = legend_keyword_rules(&default_keyword_rules());
        assert_eq!(first_match(&rules, ["CONCRETE CURB"]), Some(&Category::Curb));
        assert_eq!(first_match(&rules, ["ASPHALT PAVEMENT"]), Some(&Category::Pavement));
        assert_eq!(first_match(&rules, ["WATER MAIN"]), Some(&Category::Water));
    }
}
