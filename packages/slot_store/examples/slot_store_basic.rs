//! Basic usage of the `slot_store` crate:
//!
//! * Creating a named store.
//! * Adding, reading, modifying and removing items.
//! * Growing the store when it runs out of keys.
//! * Catching overflow in the buffer instead of growing.

use slot_store::OffsetSlotStore;

fn main() {
    let mut store = OffsetSlotStore::<String>::builder().name("MyArray").build();

    println!("Name: {}", store.name().unwrap_or("(unnamed)"));
    println!("Empty: {}", store.is_empty());

    // Inserting an item gives you a key that you can later use to look up the item again.
    let k1 = store.insert("apple".to_string()).unwrap().key().unwrap();
    let k2 = store.insert("banana".to_string()).unwrap().key().unwrap();
    let k3 = store.insert("cherry".to_string()).unwrap().key().unwrap();

    println!("Inserted keys: {k1}, {k2}, {k3}");
    println!("Size after insert: {}", store.len());
    println!("At 1: {}", store.get(1).unwrap());

    *store.get_mut(1).unwrap() = "blueberry".to_string();
    println!("Modified 1: {}", store.get(1).unwrap());

    println!("HasKey 0? {}", store.has_key(0));
    println!("HasKey 99? {}", store.has_key(99));
    println!("Contains apple? {}", store.contains(&"apple".to_string()));

    store.swap(0, 2).unwrap();
    println!(
        "After swap - At 0: {}, At 2: {}",
        store.get(0).unwrap(),
        store.get(2).unwrap()
    );

    store.remove(0).unwrap();
    println!("Size after remove: {}", store.len());
    println!("HasKey 0? {}", store.has_key(0));

    // Clearing is the only way to make removed keys available again.
    store.clear();
    println!("Size after clear: {}", store.len());
    println!("Empty after clear: {}", store.is_empty());

    // With resizing enabled, the store doubles its capacity whenever it runs out of keys.
    store.enable_resizing();

    for i in 0..150 {
        _ = store.insert(format!("item{i}")).unwrap();
    }

    println!("Size after growing insert: {}", store.len());
    println!("Capacity after growing insert: {}", store.capacity());
    println!("Resizing enabled? {}", store.is_resizing_enabled());

    // Without resizing, values that do not fit go to the overflow buffer instead.
    store.disable_resizing(true);
    store.enable_buffer();

    for i in 0..200 {
        _ = store.insert(format!("overflow_{i}")).unwrap();
    }

    println!("Size after overflow: {}", store.len());
    println!("Buffer size: {}", store.buffer_len());

    store.clear_buffer();
    println!("Buffer size after clear: {}", store.buffer_len());
}
