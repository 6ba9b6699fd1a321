// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::env;
use std::panic::{self, RefUnwindSafe, UnwindSafe};
use std::sync::Mutex;

use lazy_static::lazy_static;

lazy_static! {
  static ref ENV_LOCK: Mutex<()> = Mutex::new(());
}

/// Run `closure` with the given environment variables set (`Some`) or removed (`None`).
///
/// Tests touching the environment are serialized, and the previous values are restored even when the
/// closure panics.
pub fn with_env_vars<F>(vars: Vec<(&str, Option<&str>)>, closure: F)
where
  F: Fn() + UnwindSafe + RefUnwindSafe,
{
  // A panicking test poisons the lock, the environment is restored anyway.
  let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

  let previous: Vec<(&str, Option<String>)> = vars
    .iter()
    .map(|(name, value)| {
      let old = env::var(name).ok();
      match value {
        Some(value) => env::set_var(name, value),
        None => env::remove_var(name),
      }
      (*name, old)
    })
    .collect();

  let result = panic::catch_unwind(closure);

  for (name, old) in previous {
    match old {
      Some(value) => env::set_var(name, value),
      None => env::remove_var(name),
    }
  }
  drop(guard);

  if let Err(err) = result {
    panic::resume_unwind(err);
  }
}
