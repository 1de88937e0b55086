string_enum! {
    /// Publication state of products and articles.
    ///
    /// Any state may move to any other. Entering [PublishState::Published] stamps
    /// `first_published_at` the first time only; leaving it never clears the stamp.
    PublishState {
        Draft => "draft",
        Private => "private",
        Published => "published",
    }
}

string_enum! {
    /// Whether a product is listed publicly. Independent of [PublishState].
    Visibility {
        Public => "public",
        Restricted => "restricted",
    }
}

impl Default for PublishState {
    fn default() -> Self {
        PublishState::Draft
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}
