#![cfg(feature = "indexmap")]

use indexmap::{IndexMap, IndexSet};
use tagwire::{deserialize, serialize, Message};

#[derive(Message, Default, Debug, PartialEq)]
struct Ordered {
    #[tagwire(field = 1)]
    columns: IndexMap<String, i32>,
    #[tagwire(field = 2, encoding = "signed")]
    seen: IndexSet<i64>,
}

#[test]
fn test_insertion_order_is_preserved() {
    let mut columns = IndexMap::new();
    columns.insert("zeta".to_string(), 3);
    columns.insert("alpha".to_string(), 1);
    columns.insert("mu".to_string(), 2);
    let seen: IndexSet<i64> = [9, -4, 7].into_iter().collect();
    let value = Ordered { columns, seen };

    let decoded: Ordered = deserialize(&serialize(&value).unwrap()).unwrap();
    let keys: Vec<&str> = decoded.columns.keys().map(String::as_str).collect();
    assert_eq!(keys, ["zeta", "alpha", "mu"]);
    assert_eq!(decoded.seen.iter().copied().collect::<Vec<_>>(), [9, -4, 7]);
    assert_eq!(decoded, value);
}
