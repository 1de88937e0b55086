/// Options for controlling single-record update operations.
///
/// The defaults return the record as it is *after* the update and re-run schema
/// validation on the patched fields.
///
/// # Examples
///
/// ```rust,ignore
/// use vitrine::collection::UpdateOptions;
///
/// let options = UpdateOptions::default();
/// assert!(options.is_return_updated());
///
/// // return the pre-update record and skip validation
/// let options = UpdateOptions::new(false, false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    return_updated: bool,
    run_validators: bool,
}

impl UpdateOptions {
    /// Creates a new `UpdateOptions` with specified behavior.
    ///
    /// # Arguments
    ///
    /// * `return_updated` - If true, return the post-update record, otherwise the pre-update one
    /// * `run_validators` - If true, validate the patched fields against the entity schema
    pub fn new(return_updated: bool, run_validators: bool) -> Self {
        Self {
            return_updated,
            run_validators,
        }
    }

    pub fn is_return_updated(&self) -> bool {
        self.return_updated
    }

    pub fn is_run_validators(&self) -> bool {
        self.run_validators
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions::new(true, true)
    }
}

/// Creates `UpdateOptions` returning the record as it was before the update.
pub fn return_original() -> UpdateOptions {
    UpdateOptions::new(false, true)
}

/// Creates `UpdateOptions` that skip schema validation.
pub fn skip_validation() -> UpdateOptions {
    UpdateOptions::new(true, false)
}
