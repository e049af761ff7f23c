//! CLI smoke check.
//!
//! # Responsibility
//! - Verify `modscope_core` linkage from a standalone binary.
//! - Run one name-phase and one type-phase resolution with stable output.

use modscope_core::{ExtensionRegistry, InMemoryContext, IsolationKey, ResolveError};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug)]
struct Greeting(&'static str);

fn main() -> ExitCode {
    println!("modscope_core version={}", modscope_core::core_version());
    match run_smoke_check() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("smoke check failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_smoke_check() -> Result<(), String> {
    let registry = ExtensionRegistry::new();
    let key = IsolationKey::new("moduleA");
    let named = InMemoryContext::builder("named")
        .with("greeting", Greeting("hello"))
        .build_shared();
    let typed = Arc::new(InMemoryContext::new("typed"));
    let typed_handle: Arc<dyn modscope_core::ExtensionContext> = typed.clone();
    registry.register_context(&key, &named);
    registry.register_context(&key, &typed_handle);

    let greeting = registry
        .resolve::<Greeting>(Some(&key), "greeting")
        .map_err(describe)?
        .ok_or("greeting not resolved by name")?;
    println!("resolve name=greeting -> {}", greeting.0);

    typed.insert("limit", 64_u32);
    let limit = registry
        .resolve::<u32>(Some(&key), "anything")
        .map_err(describe)?
        .ok_or("limit not resolved by type")?;
    println!("resolve type=u32 -> {limit}");

    registry.unregister_context(&key, &named);
    let gone = registry
        .resolve::<Greeting>(Some(&key), "greeting")
        .map_err(describe)?;
    let outcome = if gone.is_some() { "found" } else { "not_found" };
    println!("resolve after unregister -> {outcome}");
    if gone.is_some() {
        return Err("greeting still visible after unregister".to_string());
    }
    Ok(())
}

fn describe(err: ResolveError) -> String {
    err.to_string()
}
