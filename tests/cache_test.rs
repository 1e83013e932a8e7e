//! Compiled-query cache behavior through the compiler facade.

mod common;

use common::{catalog, compiler};
use objql::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const QUERY: &str = "select e from Employee e where e.id = :id";

#[test]
fn test_second_compile_is_a_hit() {
    let compiler = compiler();
    let hints = QueryHints::default();
    let first = compiler.compile(QUERY, QueryLanguage::Object, &hints).unwrap();
    let second = compiler.compile(QUERY, QueryLanguage::Object, &hints).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.compilations(), 1);
    let stats = compiler.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_hints_and_language_are_part_of_the_key() {
    let compiler = compiler();
    compiler.compile(QUERY, QueryLanguage::Object, &QueryHints::default()).unwrap();
    let lazy = compiler
        .compile(QUERY, QueryLanguage::Object, &QueryHints::new().relationships(FetchPolicy::Lazy))
        .unwrap();
    assert!(!lazy.sql.contains("JOIN"));

    let native = "SELECT * FROM employee WHERE id = :id";
    compiler.compile(native, QueryLanguage::Native, &QueryHints::default()).unwrap();
    compiler.compile(native, QueryLanguage::Native, &QueryHints::default()).unwrap();

    assert_eq!(compiler.compilations(), 3);
    assert_eq!(compiler.cache_stats().entries, 3);
}

#[test]
fn test_hints_map() {
    let compiler = compiler();
    let mut hints = HashMap::new();
    hints.insert("objql.fetch.relationships".to_string(), "Lazy".to_string());
    let via_map = compiler
        .compile_with_hints_map(QUERY, QueryLanguage::Object, &hints)
        .unwrap();
    let direct = compiler
        .compile(QUERY, QueryLanguage::Object, &QueryHints::new().relationships(FetchPolicy::Lazy))
        .unwrap();
    assert!(Arc::ptr_eq(&via_map, &direct));
    assert_eq!(compiler.compilations(), 1);
}

#[test]
fn test_rejections_are_not_cached() {
    let compiler = compiler();
    for _ in 0..3 {
        assert!(
            compiler
                .compile("select e from Employee e where e.nope = 1", QueryLanguage::Object, &QueryHints::default())
                .is_err()
        );
    }
    assert_eq!(compiler.compilations(), 3);
    assert_eq!(compiler.cache_stats().entries, 0);
}

#[test]
fn test_disabled_cache_recompiles() {
    let config = CompilerConfig::from_toml_str("[cache]\nenabled = false\n").unwrap();
    let compiler = QueryCompiler::new(Arc::new(catalog()), config);
    let hints = QueryHints::default();
    let first = compiler.compile(QUERY, QueryLanguage::Object, &hints).unwrap();
    let second = compiler.compile(QUERY, QueryLanguage::Object, &hints).unwrap();
    assert_eq!(first, second);
    assert_eq!(compiler.compilations(), 2);
    assert_eq!(compiler.cache_stats().entries, 0);
}

#[test]
fn test_injected_cache_is_shared() {
    let cache = Arc::new(MemoryQueryCache::new());
    let a = QueryCompiler::with_cache(Arc::new(catalog()), CompilerConfig::default(), cache.clone());
    let b = QueryCompiler::with_cache(Arc::new(catalog()), CompilerConfig::default(), cache.clone());

    a.compile(QUERY, QueryLanguage::Object, &QueryHints::default()).unwrap();
    b.compile(QUERY, QueryLanguage::Object, &QueryHints::default()).unwrap();
    assert_eq!(a.compilations(), 1);
    assert_eq!(b.compilations(), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_concurrent_compiles_agree() {
    let compiler = Arc::new(compiler());
    let results: Vec<Arc<CompiledQuery>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let compiler = Arc::clone(&compiler);
                s.spawn(move || {
                    compiler
                        .compile(QUERY, QueryLanguage::Object, &QueryHints::default())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.windows(2).all(|w| w[0].sql == w[1].sql));
    let compilations = compiler.compilations();
    assert!((1..=4).contains(&compilations), "{}", compilations);
    assert_eq!(compiler.cache_stats().entries, 1);
}
