//! Procedural macros for table_sync
//!
//! This crate provides the `Model` derive macro, which turns a struct with
//! named fields into a table declaration for the table_sync registry.
//!
//! ```ignore
//! #[derive(Model)]
//! #[table(name = "users")]
//! struct User {
//!     #[field(primary_key, auto_increment)]
//!     id: i64,
//!     #[field(length = 100, unique)]
//!     email: String,
//!     #[field(foreign_key = "roles.id")]
//!     role_id: Option<i64>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Lit, LitStr,
    PathArguments, Token, Type,
};

const FIELD_TYPES: [&str; 10] = [
    "String", "Number", "Boolean", "Date", "Object", "Array", "Float", "Text", "DateTime",
    "Timestamp",
];

/// Derive macro implementing `table_sync::Model`
#[proc_macro_derive(Model, attributes(table, field))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_model(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_model(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Model only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Model only supports structs")),
    };

    let table_name = match parse_table_name(&input.attrs)? {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };

    let mut descriptors = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let column = attrs.name.clone().unwrap_or_else(|| {
            let ident = ident.to_string();
            ident.strip_prefix("r#").unwrap_or(&ident).to_string()
        });
        let descriptor = attrs.descriptor(&field.ty)?;
        descriptors.push(quote! { (::std::string::String::from(#column), #descriptor) });
    }

    let model_name = name.to_string();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::table_sync::Model for #name #ty_generics #where_clause {
            fn model_name() -> &'static str {
                #model_name
            }

            fn table_name() -> ::core::option::Option<&'static str> {
                #table_name
            }

            fn fields() -> ::std::vec::Vec<(::std::string::String, ::table_sync::FieldDescriptor)> {
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

/// `#[table(name = "...")]`
fn parse_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("table")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute, expected `name`"))
            }
        })?;
    }

    Ok(table)
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    skip: bool,
    field_type: Option<syn::Ident>,
    length: Option<i64>,
    required: Option<bool>,
    unique: bool,
    primary_key: bool,
    auto_increment: bool,
    default: Option<TokenStream2>,
    foreign_key: Option<(String, String)>,
    enum_values: Vec<String>,
    old_name: Option<String>,
    customize: Option<String>,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = FieldAttrs::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .map(|i| i.to_string())
                    .unwrap_or_default();

                match key.as_str() {
                    "name" => parsed.name = Some(meta.value()?.parse::<LitStr>()?.value()),
                    "skip" => parsed.skip = true,
                    "field_type" => {
                        let lit: LitStr = meta.value()?.parse()?;
                        let value = lit.value();
                        let variant = FIELD_TYPES
                            .iter()
                            .find(|t| t.eq_ignore_ascii_case(&value))
                            .ok_or_else(|| {
                                syn::Error::new_spanned(&lit, format!("unknown field type `{}`", value))
                            })?;
                        parsed.field_type = Some(format_ident!("{}", variant));
                    }
                    "length" => {
                        let lit: syn::LitInt = meta.value()?.parse()?;
                        parsed.length = Some(lit.base10_parse()?);
                    }
                    "required" => parsed.required = Some(flag(&meta)?),
                    "unique" => parsed.unique = flag(&meta)?,
                    "primary_key" => parsed.primary_key = flag(&meta)?,
                    "auto_increment" => parsed.auto_increment = flag(&meta)?,
                    "default_null" => parsed.default = Some(quote! { .default_null() }),
                    "default" => {
                        let value = meta.value()?;
                        let negative = value.parse::<Option<Token![-]>>()?.is_some();
                        let lit: Lit = value.parse()?;
                        parsed.default = Some(default_tokens(&lit, negative)?);
                    }
                    "foreign_key" => {
                        let lit: LitStr = meta.value()?.parse()?;
                        let value = lit.value();
                        match value.split_once('.') {
                            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                                parsed.foreign_key = Some((table.to_string(), column.to_string()));
                            }
                            _ => {
                                return Err(syn::Error::new_spanned(
                                    &lit,
                                    "expected foreign_key = \"table.column\"",
                                ))
                            }
                        }
                    }
                    "enum_values" => {
                        let content;
                        syn::parenthesized!(content in meta.input);
                        let values = content.parse_terminated(|input| input.parse::<LitStr>(), Token![,])?;
                        parsed.enum_values = values.iter().map(LitStr::value).collect();
                    }
                    "old_name" => parsed.old_name = Some(meta.value()?.parse::<LitStr>()?.value()),
                    "customize" => {
                        parsed.customize = Some(meta.value()?.parse::<LitStr>()?.value())
                    }
                    _ => return Err(meta.error("unsupported field attribute")),
                }

                Ok(())
            })?;
        }

        Ok(parsed)
    }

    fn descriptor(&self, ty: &Type) -> syn::Result<TokenStream2> {
        let (inner, optional) = match option_inner(ty) {
            Some(inner) => (inner, true),
            None => (ty, false),
        };

        let field_type = match &self.field_type {
            Some(field_type) => field_type.clone(),
            None => match infer_field_type(inner) {
                Some(field_type) => format_ident!("{}", field_type),
                None if !self.enum_values.is_empty() => format_ident!("String"),
                None => {
                    return Err(syn::Error::new_spanned(
                        ty,
                        "cannot infer a field type, add #[field(field_type = \"...\")]",
                    ))
                }
            },
        };

        let required = self.required.unwrap_or(!optional);
        let mut calls = vec![quote! { .required(#required) }];

        if let Some(length) = self.length {
            calls.push(quote! { .length(#length) });
        }
        if self.unique {
            calls.push(quote! { .unique(true) });
        }
        if self.primary_key {
            calls.push(quote! { .primary_key(true) });
        }
        if self.auto_increment {
            calls.push(quote! { .auto_increment(true) });
        }
        if let Some(default) = &self.default {
            calls.push(default.clone());
        }
        if let Some((table, column)) = &self.foreign_key {
            calls.push(quote! { .foreign_key(#table, #column) });
        }
        if !self.enum_values.is_empty() {
            let values = &self.enum_values;
            calls.push(quote! { .enum_values([#(#values),*]) });
        }
        if let Some(old_name) = &self.old_name {
            calls.push(quote! { .old_name(#old_name) });
        }
        if let Some(customize) = &self.customize {
            calls.push(quote! { .customize(#customize) });
        }

        Ok(quote! {
            ::table_sync::FieldDescriptor::new(::table_sync::FieldType::#field_type)
                #(#calls)*
        })
    }
}

/// Bare `flag` or `flag = true/false`
fn flag(meta: &syn::meta::ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let value: syn::LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

fn default_tokens(lit: &Lit, negative: bool) -> syn::Result<TokenStream2> {
    let sign = if negative { quote! { - } } else { quote! {} };

    match lit {
        Lit::Str(s) if !negative => {
            let value = s.value();
            Ok(quote! { .default_value(#value) })
        }
        Lit::Int(i) => {
            let value = i.base10_parse::<i64>()?;
            Ok(quote! { .default_value(#sign #value) })
        }
        Lit::Float(f) => {
            let value = f.base10_parse::<f64>()?;
            Ok(quote! { .default_value(#sign #value) })
        }
        Lit::Bool(b) if !negative => {
            let value = b.value;
            Ok(quote! { .default_value(#value) })
        }
        _ => Err(syn::Error::new_spanned(
            lit,
            "default must be a string, number or bool literal",
        )),
    }
}

/// `T` of `Option<T>`
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }

    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

fn infer_field_type(ty: &Type) -> Option<&'static str> {
    let Type::Path(path) = ty else { return None };
    let ident = path.path.segments.last()?.ident.to_string();

    let field_type = match ident.as_str() {
        "String" | "str" => "String",
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            "Number"
        }
        "bool" => "Boolean",
        "f32" | "f64" => "Float",
        "NaiveDate" => "Date",
        "NaiveDateTime" | "DateTime" => "DateTime",
        "Vec" => "Array",
        "Value" | "HashMap" | "BTreeMap" => "Object",
        _ => return None,
    };

    Some(field_type)
}
