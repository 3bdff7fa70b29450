//! Store basics: static values, computed values, watchers

use canister::{Store, Value};

fn main() {
    println!("=== Store Example ===\n");

    // Declare a store with two static properties and a derived one
    let store = Store::builder()
        .value("first_name", "Ada")
        .value("last_name", "Lovelace")
        .computed("full_name", |s| {
            let first = s.get("first_name");
            let last = s.get("last_name");
            Value::Str(format!("{first} {last}"))
        })
        .build();

    println!("1. Initial read");
    println!("   full_name = {}\n", store.get("full_name"));

    println!("2. Setting up a watcher on full_name");
    let _watch = store.watch("full_name", |new, old| {
        println!("   -> full_name changed: {old} => {new}");
    });

    println!("\n3. Changing first_name (watcher will trigger)");
    store.set("first_name", "Augusta");

    println!("\n4. Writing the same value again (no-op, watcher stays quiet)");
    store.set("first_name", "Augusta");

    println!("\n5. Tacking a new property onto the store at runtime");
    store.set("title", "Countess");
    println!("   title = {}", store.get("title"));

    println!("\n6. Snapshot of the whole store");
    println!("   {}", store.raw(true));
}
