//! jq pre-filtering of input documents, e.g. `.[]` to split a listing.
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("jq filter does not parse: {0}")]
    Parse(String),
    #[error("jq filter uses undefined names: {0}")]
    Undefined(String),
    #[error("jq filter failed: {0}")]
    Runtime(String),
    #[error("jq output is not JSON: {0}")]
    Output(#[from] serde_json::Error),
}

type Loaded<'s, E> = Vec<(load::File<&'s str, ()>, E)>;

/// Run a jq filter over one document, yielding every output as JSON.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>, FilterError> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(parse_error)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(undefined_error)?;

    let inputs = RcIter::new(core::iter::empty());
    let out = filter
        .run((Ctx::new([], &inputs), Val::from(input.clone())))
        .map(|item| -> Result<Value, FilterError> {
            let val = item.map_err(|e| FilterError::Runtime(format!("{e:?}")))?;
            Ok(serde_json::from_str(&val.to_string())?)
        })
        .collect();
    out
}

fn parse_error(errs: Loaded<'_, load::Error<&str>>) -> FilterError {
    let msgs: Vec<String> = errs.iter().map(|(_, err)| format!("{err:?}")).collect();
    FilterError::Parse(msgs.join("; "))
}

fn undefined_error(errs: Loaded<'_, Vec<(&str, Undefined)>>) -> FilterError {
    let names: Vec<String> = errs
        .iter()
        .flat_map(|(_, list)| list.iter())
        .map(|(name, undef)| format!("`{name}` ({undef:?})"))
        .collect();
    FilterError::Undefined(names.join(", "))
}
