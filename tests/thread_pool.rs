use market_influence_analyzer::{configure_thread_pool, AnalysisError};

#[test]
fn global_pool_is_configured_once() {
    // Its own test binary, so nothing else has touched the global pool
    assert_eq!(configure_thread_pool(2).unwrap(), 2);
    assert_eq!(rayon::current_num_threads(), 2);

    let err = configure_thread_pool(3).unwrap_err();
    assert!(matches!(err, AnalysisError::ThreadPool(_)));
}
