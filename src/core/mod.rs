// This file is the module declaration file for the `core` module.
// It holds everything that touches the outside world during a run: the
// target file, the git repository, and the loop that ties them together.

// `config` module:
// Resolved run settings (`PruneSettings`) and the lookup of the forwarding
// list next to the executable.
pub mod config;

// `engine` module:
// The `PruneEngine`, which walks a snapshot of the file and turns every
// matched line into its own rewrite, stage and commit.
pub mod engine;

// `error` module:
// The `PruneError` taxonomy shared by the library.
pub mod error;

// `git` module:
// The `VcsClient` trait and its two implementations, one shelling out to
// `git` and one using libgit2.
pub mod git;

// `lines` module:
// `ConfigLine` and `LineSet`, the in-memory view of the file.
pub mod lines;

// `store` module:
// `ConfigFile`, which loads the list and rewrites it durably.
pub mod store;
