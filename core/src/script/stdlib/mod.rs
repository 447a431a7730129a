//! Standard library natives
//!
//! Installed into every host's [`NativeRegistry`] before plugins register
//! their own functions, so a plugin may deliberately shadow one of these.

pub mod basic;
pub mod math;

use super::native::NativeRegistry;

/// Register the core functions and the `Math` table
pub fn install(natives: &mut NativeRegistry) {
    natives.register("print", basic::print);
    natives.register("type", basic::type_of);
    natives.register("str", basic::to_str);
    natives.register("len", basic::len);
    natives.register("push", basic::push);
    natives.register("keys", basic::keys);
    natives.register("clock", basic::clock);

    natives.register_in("Math", "floor", math::floor);
    natives.register_in("Math", "ceil", math::ceil);
    natives.register_in("Math", "abs", math::abs);
    natives.register_in("Math", "round", math::round);
    natives.register_in("Math", "min", math::min);
    natives.register_in("Math", "max", math::max);
    natives.register_in("Math", "sqrt", math::sqrt);
}
