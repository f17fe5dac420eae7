#[cfg(test)]
use similar_asserts::assert_eq;

/// Creates a template context with keys and values.
///
/// ```rust
/// # use railplate::context;
/// let ctx = context! {
///     railroad => "BNSF",
///     road_number => 3941,
/// };
/// ```
///
/// Alternatively if the variable name matches the key name it can
/// be omitted:
///
/// ```rust
/// # use railplate::context;
/// let railroad = "BNSF";
/// let ctx = context! { railroad };
/// ```
///
/// The return value is a [`Value`](crate::value::Value).
///
/// Note that [`context!`] can also be used recursively if you need to
/// create nested records:
///
/// ```rust
/// # use railplate::context;
/// let ctx = context! {
///     photos => vec![
///         context!(id => 1, title => "Eastbound at Cajon"),
///         context!(id => 2, title => "Yard power at dusk"),
///     ]
/// };
/// ```
#[macro_export]
macro_rules! context {
    (
        $($key:ident $(=> $value:expr)?),* $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut ctx = $crate::value::ValueMap::default();
        $(
            $crate::__pair!(ctx, $key $(, $value)?);
        )*
        $crate::value::Value::from(ctx)
    }}
}

#[macro_export]
#[doc(hidden)]
macro_rules! __pair {
    ($ctx:ident, $key:ident) => {{
        $crate::__pair!($ctx, $key, $key);
    }};
    ($ctx:ident, $key:ident, $value:expr) => {
        $ctx.insert(
            stringify!($key).to_string(),
            $crate::value::Value::from_serialize(&$value),
        );
    };
}

#[test]
fn test_macro() {
    use crate::value::Value;
    let var1 = 23;
    let ctx = context!(var1, var2 => 42);
    assert_eq!(ctx.get_attr("var1"), Value::from(23));
    assert_eq!(ctx.get_attr("var2"), Value::from(42));
}
