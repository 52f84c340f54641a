use std::sync::OnceLock;

use regex::Regex;

use bf_core::{VariableStore, VariableValue};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\$(\w+)\}").expect("placeholder pattern"))
}

/// Replaces `{$name}` placeholders with the named variable's current value.
/// Unknown names are left in place so typos stay visible in the output.
pub(crate) fn substitute(text: &str, variables: &VariableStore) -> String {
    placeholder_pattern()
        .replace_all(text, |captures: &regex::Captures<'_>| {
            let name = &captures[1];
            match variables.get(name).map(|variable| &variable.value) {
                Some(VariableValue::Scalar(scalar)) => scalar.to_string(),
                Some(VariableValue::Collection(collection)) => {
                    let items: Vec<String> = (0..collection.count())
                        .filter_map(|index| collection.get_scalar(index).ok())
                        .map(|scalar| scalar.to_string())
                        .collect();
                    format!("[{}]", items.join(", "))
                }
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::{AnyCollection, Collection, Scalar, Variable};

    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store
            .declare(Variable::scalar("hp", Scalar::Integer(42)))
            .expect("declare");
        store
            .declare(Variable::scalar("who", Scalar::Str("ada".to_string())))
            .expect("declare");
        store
            .declare(Variable::collection(
                "bag",
                AnyCollection::Integer(Collection::from_items(vec![1, 2])),
            ))
            .expect("declare");
        store
    }

    #[test]
    fn scalars_and_collections_are_formatted() {
        let out = substitute("{$who} has {$hp} hp and {$bag}", &store());
        assert_eq!(out, "ada has 42 hp and [1, 2]");
    }

    #[test]
    fn unknown_placeholders_are_left_in_place() {
        assert_eq!(substitute("{$ghost}!", &store()), "{$ghost}!");
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        assert_eq!(substitute("plain text", &store()), "plain text");
    }
}
