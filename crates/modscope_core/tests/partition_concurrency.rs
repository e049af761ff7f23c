use modscope_core::{
    ExtensionContext, ExtensionRegistry, InMemoryContext, IsolationKey, PartitionIndex,
};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 16;

#[test]
fn concurrent_first_access_publishes_one_set() {
    let index = Arc::new(PartitionIndex::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let key = IsolationKey::new("moduleA");

    let handles = (0..THREADS)
        .map(|_| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            let key = key.clone();
            thread::spawn(move || {
                barrier.wait();
                index.get_or_create(&key)
            })
        })
        .collect::<Vec<_>>();

    let sets = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should not panic"))
        .collect::<Vec<_>>();

    assert_eq!(index.len(), 1);
    for set in &sets[1..] {
        assert!(Arc::ptr_eq(&sets[0], set));
    }
}

#[test]
fn concurrent_registration_loses_no_contexts() {
    let index = Arc::new(PartitionIndex::new());
    let barrier = Arc::new(Barrier::new(THREADS));
    let key = IsolationKey::new("moduleA");
    let contexts = (0..THREADS)
        .map(|i| InMemoryContext::new(format!("ctx-{i}")).into_shared())
        .collect::<Vec<_>>();

    let handles = contexts
        .iter()
        .cloned()
        .map(|context| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            let key = key.clone();
            thread::spawn(move || {
                barrier.wait();
                // Registering twice must not produce a duplicate entry.
                index.add(&key, &context);
                index.add(&key, &context);
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("thread should not panic");
    }

    let set = index.get(&key).expect("partition exists");
    assert_eq!(set.len(), THREADS);
    for context in &contexts {
        assert!(set.contains(context));
    }
}

#[test]
fn resolution_tolerates_concurrent_membership_changes() {
    let registry = Arc::new(ExtensionRegistry::new());
    let key = IsolationKey::new("moduleA");
    let stable = InMemoryContext::builder("stable")
        .with("svc", 42_u64)
        .build_shared();
    registry.register_context(&key, &stable);

    let writer = {
        let registry = Arc::clone(&registry);
        let key = key.clone();
        thread::spawn(move || {
            for i in 0..200 {
                let churn: Arc<dyn ExtensionContext> =
                    InMemoryContext::builder(format!("churn-{i}"))
                        .with("other", i as u32)
                        .build_shared();
                registry.register_context(&key, &churn);
                registry.unregister_context(&key, &churn);
            }
        })
    };

    let readers = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let found = registry
                        .resolve::<u64>(Some(&key), "svc")
                        .expect("no ambiguity")
                        .expect("stable context always visible");
                    assert_eq!(*found, 42);
                }
            })
        })
        .collect::<Vec<_>>();

    writer.join().expect("writer should not panic");
    for reader in readers {
        reader.join().expect("reader should not panic");
    }

    assert_eq!(registry.partition(&key).len(), 1);
}

#[test]
fn unrelated_keys_get_distinct_sets() {
    let index = Arc::new(PartitionIndex::new());
    let handles = (0..THREADS)
        .map(|i| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let key = IsolationKey::new(format!("module-{}", i % 4));
                let context = InMemoryContext::new(format!("ctx-{i}")).into_shared();
                index.add(&key, &context);
                context
            })
        })
        .collect::<Vec<_>>();
    let contexts = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should not panic"))
        .collect::<Vec<_>>();

    assert_eq!(index.len(), 4);
    let total = index
        .keys()
        .iter()
        .map(|key| index.get_or_create(key).len())
        .sum::<usize>();
    assert_eq!(total, contexts.len());
}
