use super::errors::TaskError;
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

pub type TaskResult<T> = Result<T, TaskError>;

/// Достаёт текст из payload паники (`panic!("...")` даёт `&str` или `String`)
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Дропает payload паники; если его `Drop` сам паникует, вторая паника
/// гасится, а её payload утекает
pub(crate) fn drop_panic_payload(payload: Box<dyn Any + Send>) {
    if let Err(nested) = catch_unwind(AssertUnwindSafe(move || drop(payload))) {
        std::mem::forget(nested);
    }
}
