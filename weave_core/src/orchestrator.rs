//! Top-level `weave` entry point (spec.md §2 data-flow, §5 ordering
//! guarantees): Loader → Idempotence Guard → Filter → Caller-Side Pass A →
//! Counter Store Allocator → Body Instrumenter → Caller-Side Pass B →
//! Re-optimizer → Symbol Reconciler → Backup → Saver.
//!
//! Grounded on `bsharp_cli`'s `commands::analyze` pattern of a single
//! function that takes a fully-resolved config and returns a serializable
//! report, with every step logged at `info`/`warn` as it runs rather than
//! printed directly — the CLI binary decides how (or whether) to render
//! the summary.

use std::collections::HashMap;

use dotscope::prelude::*;

use crate::body::{self, BodyEditor};
use crate::caller_side;
use crate::cil::{self, AssemblyBodyEditor, AssemblyCounterStore};
use crate::config::Config;
use crate::error::{Result, WeaveError};
use crate::filter::Filter;
use crate::helper::Allocator;
use crate::idempotence;
use crate::model::{CanonicalSignature, MethodInfo, TypeInfo};
use crate::recompact;
use crate::report::WeaveSummary;
use crate::session::WeaveSession;
use crate::{backup, symbols};

/// Runs one full weave over `config.input`, per spec.md §2/§5. Returns a
/// summary describing what happened whether or not anything was actually
/// written — a clean idempotent skip and a dry run both return `Ok` with
/// the relevant flag set, not an error (spec.md §7: item-level problems
/// never abort the run).
pub fn weave(config: &Config) -> Result<WeaveSummary> {
    log::info!("loading {}", config.input.display());
    let loaded = cil::load_module(&config.input, &config.search_dirs)?;
    let mut summary = WeaveSummary::new(config.input.display().to_string());

    let top_level = cil::snapshot_types(&loaded.assembly);
    summary.types_scanned = count_types(&top_level);

    let field_names = cil::snapshot_field_names(&loaded.assembly);
    if idempotence::already_instrumented(&field_names, &config.field_prefix) {
        log::info!("module already instrumented, skipping");
        summary.skipped_already_instrumented = true;
        return Ok(summary);
    }

    let filter = Filter::new(config);
    let mut body_methods = Vec::new();
    let mut caller_methods = Vec::new();
    let mut namespace_of = HashMap::new();
    collect_eligible(&top_level, "", &filter, &mut body_methods, &mut caller_methods, &mut namespace_of);

    if config.dry_run {
        log::info!(
            "dry run: {} body-eligible, {} caller-side-eligible methods found",
            body_methods.len(),
            caller_methods.len()
        );
        summary.methods_body_instrumented = body_methods.len();
        summary.methods_caller_side_instrumented = caller_methods.len();
        return Ok(summary);
    }

    // `BuilderContext::new` takes the assembly by value (per dotscope's
    // `tests/modify_add.rs`) and hands it back via `finish()` once every
    // mutation is queued; `symbols` is pulled out first since `loaded` is
    // consumed here.
    let symbols = loaded.symbols.clone();
    let mut session = WeaveSession::new();
    let mut context = BuilderContext::new(loaded.assembly);

    {
        let mut store = AssemblyCounterStore::new(&mut context);
        session.caller_targets =
            caller_side::discover(&mut store, &mut session.helpers, config, &namespace_of, &caller_methods)?;
    }
    summary.methods_caller_side_instrumented = caller_methods.len();

    for method in &body_methods {
        let helper_namespace = namespace_of
            .get(&method.declaring_type_fqn)
            .cloned()
            .unwrap_or_default();
        let simple_type_name = method
            .declaring_type_fqn
            .rsplit('.')
            .next()
            .unwrap_or(&method.declaring_type_fqn);

        let field = {
            let mut store = AssemblyCounterStore::new(&mut context);
            let mut alloc = Allocator::new(&mut store, &mut session.helpers, config);
            let helper = alloc.get_or_create_helper(&helper_namespace, simple_type_name)?;
            alloc.get_or_create_counter_field(helper, &method.simple_name)?
        };

        let mut editor = AssemblyBodyEditor::new(&mut context);
        if let Err(e) = body::splice_prelude(&mut editor, method.id, field) {
            log::warn!("instrumentation failed for {}: {e}", method.simple_name);
            summary.push_warning(format!("{}: {e}", method.simple_name));
            continue;
        }
        summary.methods_body_instrumented += 1;
    }

    if !session.caller_targets.is_empty() {
        let all_methods = flatten_methods(&top_level);
        for caller in &all_methods {
            if !caller.has_body {
                continue;
            }

            // Resolve every call-site token up front, under its own
            // immutable borrow of `context`, so the mutable borrow the
            // editor needs below doesn't overlap with it.
            let mut token_cache: HashMap<u32, CanonicalSignature> = HashMap::new();
            {
                let mut editor = AssemblyBodyEditor::new(&mut context);
                let instrs = editor.read_instructions(caller.id)?;
                let call_tokens: Vec<Token> = instrs
                    .iter()
                    .filter(|i| i.opcode.is_call())
                    .filter_map(|i| match i.operand {
                        crate::instr::Operand::Token(t) => Some(t),
                        _ => None,
                    })
                    .collect();

                for token in call_tokens {
                    if let std::collections::hash_map::Entry::Vacant(slot) = token_cache.entry(token.value()) {
                        if let Some(sig) = cil::resolve_call_target(&context, token) {
                            slot.insert(sig);
                        }
                    }
                }
            }

            let mut editor = AssemblyBodyEditor::new(&mut context);
            let ctx_ref = &session.caller_targets;
            let inserted = caller_side::instrument_call_sites(&mut editor, caller.id, ctx_ref, |instr| {
                match instr.operand {
                    crate::instr::Operand::Token(token) => token_cache.get(&token.value()).cloned(),
                    _ => None,
                }
            })?;
            summary.call_sites_instrumented += inserted;
        }
    }

    summary.helper_types_created = session.helpers.helpers_created();
    summary.counter_fields_created = session.helpers.fields_created();

    recompact_modified_bodies(&mut context, &body_methods, &flatten_methods(&top_level));

    let mut assembly = context.finish();
    assembly.validate_and_apply_changes().map_err(WeaveError::Metadata)?;

    let output_path = config.output_path();
    let backup_record = if config.no_backup {
        None
    } else {
        Some(backup::create(&config.input, config.backup_dir.as_deref())?)
    };

    assembly
        .write_to_file(output_path)
        .map_err(|source| WeaveError::SaveFailure {
            path: output_path.to_path_buf(),
            source,
        })?;

    if let Some(convention) = loaded_convention(&symbols) {
        symbols::reconcile(output_path, Some(&convention))?;
    }

    if let Some(record) = &backup_record {
        log::info!("backup written to {}", record.backup_path.display());
    }

    Ok(summary)
}

fn loaded_convention(state: &cil::SymbolState) -> Option<cil::SymbolConvention> {
    match state {
        cil::SymbolState::Loaded(c) => Some(c.clone()),
        _ => None,
    }
}

fn count_types(types: &[TypeInfo]) -> usize {
    types.iter().map(|t| 1 + count_types(&t.nested)).sum()
}

fn flatten_methods(types: &[TypeInfo]) -> Vec<MethodInfo> {
    let mut out = Vec::new();
    for ty in types {
        out.extend(ty.methods.iter().cloned());
        out.extend(flatten_methods(&ty.nested));
    }
    out
}

fn collect_eligible(
    types: &[TypeInfo],
    _parent_namespace: &str,
    filter: &Filter,
    body_methods: &mut Vec<MethodInfo>,
    caller_methods: &mut Vec<MethodInfo>,
    namespace_of: &mut HashMap<String, String>,
) {
    for ty in types {
        let fqn = ty.fqn();
        if !filter.type_eligible(ty, &fqn) {
            continue;
        }
        namespace_of.insert(fqn.clone(), ty.namespace.clone());

        for method in &ty.methods {
            if filter.body_eligible(method) {
                body_methods.push(method.clone());
            } else if filter.caller_side_eligible(method) {
                caller_methods.push(method.clone());
            }
        }

        collect_eligible(&ty.nested, &fqn, filter, body_methods, caller_methods, namespace_of);
    }
}

fn recompact_modified_bodies(context: &mut BuilderContext, body_methods: &[MethodInfo], all_methods: &[MethodInfo]) {
    let mut touched: Vec<&MethodInfo> = body_methods.iter().collect();
    touched.extend(all_methods.iter().filter(|m| m.has_body));

    for method in touched {
        let mut editor = AssemblyBodyEditor::new(context);
        if let Ok(instructions) = editor.read_instructions(method.id) {
            let recompacted = recompact::recompact(instructions);
            if let Ok(max_stack) = editor.max_stack(method.id) {
                let _ = editor.write_instructions(method.id, &recompacted, max_stack.max(2));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_types_counts_nested_types_too() {
        let leaf = TypeInfo {
            id: crate::ids::TypeId(dotscope::metadata::token::Token::new(1)),
            namespace: "Demo".to_string(),
            simple_name: "Inner".to_string(),
            generic_arity: 0,
            is_interface: false,
            is_abstract: false,
            is_sealed: false,
            is_compiler_generated: false,
            nested: Vec::new(),
            methods: Vec::new(),
        };
        let parent = TypeInfo {
            nested: vec![leaf],
            ..leaf_like()
        };
        assert_eq!(count_types(&[parent]), 2);
    }

    fn leaf_like() -> TypeInfo {
        TypeInfo {
            id: crate::ids::TypeId(dotscope::metadata::token::Token::new(2)),
            namespace: "Demo".to_string(),
            simple_name: "Outer".to_string(),
            generic_arity: 0,
            is_interface: false,
            is_abstract: false,
            is_sealed: false,
            is_compiler_generated: false,
            nested: Vec::new(),
            methods: Vec::new(),
        }
    }
}
