mod errors;
mod field_resolvers;
