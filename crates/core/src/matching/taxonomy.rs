//! Grocery keyword taxonomy for items typed without a category

use super::normalize::tokens;

const TAXONOMY: &[(&str, &[&str])] = &[
    (
        "dairy",
        &["milk", "cheese", "yogurt", "yoghurt", "butter", "cream", "eggs", "egg", "kefir"],
    ),
    (
        "produce",
        &[
            "apple", "apples", "banana", "bananas", "lettuce", "spinach", "tomato", "tomatoes",
            "onion", "onions", "potato", "potatoes", "carrot", "carrots", "avocado", "lemon",
            "lemons", "garlic", "berries", "strawberries",
        ],
    ),
    ("meat", &["chicken", "beef", "pork", "turkey", "bacon", "sausage", "ham", "lamb", "steak"]),
    ("seafood", &["salmon", "tuna", "shrimp", "cod", "tilapia", "crab", "fish"]),
    ("bakery", &["bread", "bagel", "bagels", "muffin", "muffins", "tortilla", "tortillas", "buns"]),
    ("beverages", &["juice", "coffee", "tea", "soda", "water", "seltzer", "kombucha"]),
    ("frozen", &["frozen", "icecream", "popsicle"]),
    (
        "pantry",
        &["rice", "pasta", "flour", "sugar", "oil", "beans", "cereal", "oats", "sauce", "salt"],
    ),
    ("snacks", &["chips", "crackers", "cookies", "pretzels", "popcorn", "nuts"]),
    ("household", &["detergent", "towels", "tissue", "soap", "sponges", "foil"]),
];

/// Category for a normalized item name, taken from the first taxonomy entry that
/// owns one of the name's tokens.
pub fn infer_category(normalized_name: &str) -> Option<&'static str> {
    let name_tokens = tokens(normalized_name);

    TAXONOMY
        .iter()
        .find(|(_, keywords)| name_tokens.iter().any(|token| keywords.contains(token)))
        .map(|(category, _)| *category)
}
