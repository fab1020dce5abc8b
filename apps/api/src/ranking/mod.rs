// Resume ranking: tokenization, TF-IDF vector space, k-nearest-neighbour search.
// CPU-bound ranking runs inside tokio::task::spawn_blocking.

pub mod handlers;
pub mod knn;
pub mod ranker;
pub mod summary;
pub mod text;
pub mod tfidf;
