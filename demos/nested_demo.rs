//! Deep observability: mutations inside nested containers drive recomputation

use canister::{Store, Value};

fn main() {
    println!("=== Nested Observability Example ===\n");

    let store = Store::builder()
        .value(
            "cart",
            Value::map([("items", Value::list([3, 7, 12]))]),
        )
        .computed("total", |s| {
            let cart = s.get("cart");
            let items = cart.as_object().unwrap().get("items").unwrap();
            let sum: i64 = items
                .as_array()
                .unwrap()
                .raw()
                .iter()
                .filter_map(Value::as_i64)
                .sum();
            Value::Int(sum)
        })
        .build();

    println!("1. Initial total = {}\n", store.get("total"));

    println!("2. Pushing onto the nested array");
    let cart = store.get("cart");
    let items = cart.as_object().unwrap().get("items").unwrap();
    let items = items.as_array().unwrap().clone();
    items.push(20);
    println!("   total = {}\n", store.get("total"));

    println!("3. Splicing out the first two items");
    let removed = items.splice(0, 2, Vec::<Value>::new());
    println!("   removed {} items", removed.len());
    println!("   total = {}\n", store.get("total"));

    println!("4. Raw writes bypass the pipeline");
    items.raw_mut(|backing| backing[0] = Value::Int(1000));
    println!("   total (still cached) = {}", store.get("total"));
}
