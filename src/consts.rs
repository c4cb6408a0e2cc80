pub mod store_const {
    pub const USER_TABLE: &str = "users";
    pub const MEETME_TABLE: &str = "meetmes";
    pub const MEETME_MESSAGE_TABLE: &str = "meetme_messages";

    pub const MAX_PER_PAGE: u32 = 500;
}

pub mod meetme_const {
    /// Value written to `subject` on every new meetme.
    pub const SUBJECT_PLACEHOLDER: &str = "Hidden";

    pub const USER_LIST_LIMIT: u32 = 100;
    pub const MESSAGE_LIST_LIMIT: u32 = 100;
    pub const ADMIN_DEFAULT_PER_PAGE: u32 = 50;
}

pub mod field {
    pub const ID: &str = "id";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";

    pub const EMAIL: &str = "email";
    pub const IS_ADMIN: &str = "isAdmin";
    pub const VERIFIED: &str = "verified";

    pub const USER: &str = "user";
    pub const REQUEST_ID: &str = "requestId";
    pub const NAME: &str = "name";
    pub const PHONE: &str = "phone";
    pub const MESSAGE: &str = "message";
    pub const STATUS: &str = "status";
    pub const SUBJECT: &str = "subject";

    pub const MEETME: &str = "meetme";
    pub const AUTHOR_TYPE: &str = "authorType";
}
