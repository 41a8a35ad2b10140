mod newton;
