// ============================================================================
// central-state - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Listeners and observers usually need their own handle to the store they
/// read from; this removes the clone-before-move boilerplate.
///
/// # Usage
///
/// ```rust
/// use central_state::{cloned, Store};
/// use std::rc::Rc;
///
/// let store = Rc::new(Store::new());
///
/// store.listen(cloned!(store => move |_prev: &central_state::State| {
///     let _todos = store.get("todos");
/// }), ["todos"]);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a [`Patch`](crate::Patch) from `key => value` pairs.
///
/// Values are anything `serde_json::json!` accepts as an expression.
///
/// # Usage
///
/// ```rust
/// use central_state::patch;
///
/// let p = patch! { "todos" => vec!["buy milk"], "count" => 1 };
/// assert_eq!(p.len(), 2);
/// assert_eq!(p["count"], 1);
///
/// let empty = patch! {};
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! patch {
    () => {
        $crate::Patch::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut map = $crate::Patch::new();
            $( map.insert(::std::string::String::from($key), $crate::serde_json::json!($value)); )+
            map
        }
    };
}
