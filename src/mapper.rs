//! Keyword mapping from marketplace product names to stock-keeping units.
//!
//! Products are tried in sheet order and the first one with any keyword
//! contained in the raw name wins, even when a later product also matches.
//! Matching is a literal substring check; there is no scoring.

use crate::model::CanonicalProduct;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchCase {
    #[default]
    Sensitive,
    Insensitive,
}

/// Case-sensitive first-match lookup.
pub fn map_to_canonical<'a>(
    raw_product_name: &str,
    canonical_products: &'a [CanonicalProduct],
) -> Option<&'a CanonicalProduct> {
    map_with_case(raw_product_name, canonical_products, MatchCase::Sensitive)
}

pub fn map_with_case<'a>(
    raw_product_name: &str,
    canonical_products: &'a [CanonicalProduct],
    case: MatchCase,
) -> Option<&'a CanonicalProduct> {
    let haystack = match case {
        MatchCase::Sensitive => raw_product_name.to_string(),
        MatchCase::Insensitive => raw_product_name.to_lowercase(),
    };

    for product in canonical_products {
        for keyword in product.keywords() {
            let hit = match case {
                MatchCase::Sensitive => haystack.contains(keyword),
                MatchCase::Insensitive => haystack.contains(&keyword.to_lowercase()),
            };
            if hit {
                return Some(product);
            }
        }
    }

    None
}
