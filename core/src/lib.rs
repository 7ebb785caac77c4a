//! Polymorphic sequence and collection runtime.
//!
//! Heterogeneous containers (arrays, lists, hash maps, records, hash sets,
//! sorted sets and lazy sequences) share one sequence abstraction. On top of
//! it sit restartable lazy sequences, reduction with early termination and a
//! transducer protocol.

pub mod assoc;
pub mod atom;
pub mod compare;
pub mod config;
pub mod error;
pub mod fns;
pub mod interner;
pub mod iter;
pub mod kind;
pub mod lazy;
pub mod numeric;
pub mod print;
pub mod re;
pub mod reduce;
pub mod sorted_set;
pub mod value;
pub mod xform;

// Re-export commonly used items for convenience
pub use assoc::{
    assoc, assoc_in, assoc_in_mut, assoc_kvs, assoc_kvs_mut, assoc_mut, conj, conj_mut, contains,
    disj, disj_mut, dissoc, dissoc_mut, find, frequencies, get, get_in, get_or, group_by, keys,
    merge, merge_with, peek, pop, select_keys, update, update_in, update_keys, update_mut,
    update_vals, vals, zipmap,
};
pub use atom::{Atom, SharedAtom, atom};
pub use compare::{compare, max_key, min_key, sort, sort_by, sort_by_with, sort_with};
pub use config::Config;
pub use error::{Error, ExInfo, Result, ex_cause, ex_data, ex_info, ex_message};
pub use interner::Key;
pub use iter::{Cursor, count, first, is_empty, iter, last, next, nth, second, seq, set, to_vec, vec};
pub use kind::{Kind, empty, kind_of};
pub use lazy::{LazySeq, lazy, rest};
pub use numeric::NumericType;
pub use print::{pr_str, to_json};
pub use reduce::{
    Reducer, ensure_reduced, fold, is_reduced, reduce, reduce_from, reduce_kv, reduced, unreduced,
};
pub use sorted_set::{Bound, SortedSet, sorted_set};
pub use value::{NativeFn, Value, hash_map, list, record, vector};
pub use xform::{Transducer, comp, into, into_with, transduce, transduce_default};
