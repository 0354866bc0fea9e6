use crate::passes;

#[test]
fn builtin_table() {
    assert!(
        passes::available()
            .iter()
            .any(|(name, _)| *name == "dump")
    );
    assert!(passes::create("dump").is_some());
    assert!(passes::create("does-not-exist").is_none());
}
